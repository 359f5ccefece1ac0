//! Cache invalidation capability.
//!
//! When a track is left (and repeat mode is off) the engine tells whoever
//! caches its segments that they can be dropped. The transport is the host's
//! choice: a background-worker message in browsers, an HTTP call elsewhere.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::platform::PlatformSendSync;

/// Message posted to a background worker that owns a segment cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerMessage {
    #[serde(rename = "CLEAR_TRACK")]
    ClearTrack {
        #[serde(rename = "trackId")]
        track_id: String,
    },
}

impl WorkerMessage {
    pub fn clear_track(track_id: impl Into<String>) -> Self {
        Self::ClearTrack {
            track_id: track_id.into(),
        }
    }
}

/// Fire-and-forget notification that a track's cached segments are stale.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait CacheInvalidator: PlatformSendSync {
    /// Ask the cache owner to drop everything stored for `track_id`.
    ///
    /// Callers log and ignore failures; no response body is expected.
    async fn invalidate(&self, track_id: &str) -> Result<()>;
}

/// Invalidator for hosts without any segment cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInvalidator;

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl CacheInvalidator for NoopInvalidator {
    async fn invalidate(&self, _track_id: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_message_wire_format() {
        let message = WorkerMessage::clear_track("abc123");
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "type": "CLEAR_TRACK", "trackId": "abc123" })
        );

        let parsed: WorkerMessage = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, message);
    }

    #[tokio::test]
    async fn test_noop_invalidator_accepts_everything() {
        NoopInvalidator.invalidate("anything").await.unwrap();
    }
}
