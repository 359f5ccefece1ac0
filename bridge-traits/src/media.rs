//! Media output bridge traits.
//!
//! The playback engine never touches an audio element or a media-source
//! object directly. Hosts expose two capabilities instead:
//!
//! - [`MediaHost`]: the single audio output of the process. It can say
//!   whether the runtime has a low-level buffering API at all, open a decode
//!   buffer for a MIME type, report the playback clock and play/pause.
//! - [`MediaBuffer`]: one opened decode buffer. Appends and removals complete
//!   asynchronously; at most one of them may be pending at a time, and the
//!   caller (not the buffer) is responsible for honouring that.
//!
//! In a browser these map to `HTMLAudioElement`, `MediaSource` and
//! `SourceBuffer`.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use crate::error::Result;
use crate::platform::PlatformSendSync;

/// A contiguous span of buffered media, in seconds of presentation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Length of the span in seconds (never negative).
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn contains(&self, position: f64) -> bool {
        position >= self.start && position <= self.end
    }
}

/// Shared handle to an opened decode buffer.
pub type SharedMediaBuffer = Arc<dyn MediaBuffer>;

/// An opened decode buffer attached to the host's audio output.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait MediaBuffer: PlatformSendSync {
    /// `true` while an append or removal is still being processed.
    fn is_updating(&self) -> bool;

    /// The first buffered range, or `None` when nothing is buffered.
    fn buffered(&self) -> Option<TimeRange>;

    /// Append encoded bytes. Resolves when the runtime signals the update
    /// finished.
    ///
    /// # Errors
    ///
    /// Fails if the buffer is detached, already updating, or the runtime
    /// rejects the data.
    async fn append(&self, data: Bytes) -> Result<()>;

    /// Remove `[start, end)` seconds of buffered media. Resolves when the
    /// runtime signals the update finished.
    async fn remove(&self, start: f64, end: f64) -> Result<()>;

    /// Signal that no more data will be appended.
    fn end_of_stream(&self) -> Result<()>;

    /// Detach the buffer from the audio output and release every handle it
    /// holds. Must be safe to call more than once.
    fn detach(&self) -> Result<()>;
}

/// The process-wide audio output.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait MediaHost: PlatformSendSync {
    /// Whether the runtime exposes a low-level buffering API. When it does
    /// not, callers fall back to [`MediaHost::set_source_url`].
    fn supports_buffering(&self) -> bool;

    /// Whether a decode buffer can be opened for `mime_type`.
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Create a decode buffer for `mime_type` and attach it to the output.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Unsupported`](crate::error::BridgeError::Unsupported)
    /// when the runtime cannot decode `mime_type`.
    async fn open_buffer(&self, mime_type: &str) -> Result<SharedMediaBuffer>;

    /// Point the output at a plain URL, bypassing decode buffers.
    fn set_source_url(&self, url: &str) -> Result<()>;

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Start or resume playback. Resolves once the runtime accepted the
    /// request (autoplay policies may reject it).
    async fn play(&self) -> Result<()>;

    fn pause(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_helpers() {
        let range = TimeRange::new(2.0, 12.5);
        assert_eq!(range.duration(), 10.5);
        assert!(range.contains(2.0));
        assert!(range.contains(12.5));
        assert!(!range.contains(13.0));

        let inverted = TimeRange::new(5.0, 1.0);
        assert_eq!(inverted.duration(), 0.0);
    }
}
