//! # Streaming Configuration
//!
//! Segment size, retention window and backend endpoints for the engine.

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};

/// MIME type every decode buffer is opened with.
pub const DEFAULT_MIME_TYPE: &str = "audio/webm; codecs=\"opus\"";

/// Streaming configuration.
///
/// Fixed for the lifetime of an engine; the codec is never negotiated per
/// track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Backend prefix prepended to the stream and cache paths.
    ///
    /// Default: `/api` (relative to the page origin in browsers).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bytes requested per segment.
    ///
    /// Default: 256 KiB.
    #[serde(default = "default_segment_bytes")]
    pub segment_bytes: u64,

    /// Seconds of already-played media kept behind the playhead.
    ///
    /// Default: 30 seconds.
    #[serde(default = "default_keep_window_secs")]
    pub keep_window_secs: f64,

    /// Extra seconds preserved in front of the eviction cut.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_safety_margin_secs")]
    pub safety_margin_secs: f64,

    #[serde(default = "default_mime_type")]
    pub mime_type: String,

    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    #[serde(default = "default_clear_cache_path")]
    pub clear_cache_path: String,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            segment_bytes: default_segment_bytes(),
            keep_window_secs: default_keep_window_secs(),
            safety_margin_secs: default_safety_margin_secs(),
            mime_type: default_mime_type(),
            stream_path: default_stream_path(),
            clear_cache_path: default_clear_cache_path(),
        }
    }
}

impl StreamingConfig {
    /// Smaller segments so the first append lands sooner.
    pub fn low_latency() -> Self {
        Self {
            segment_bytes: 64 * 1024,
            ..Default::default()
        }
    }

    /// Short retention window for memory-constrained devices.
    pub fn low_memory() -> Self {
        Self {
            segment_bytes: 128 * 1024,
            keep_window_secs: 10.0,
            safety_margin_secs: 2.0,
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_segment_bytes(mut self, segment_bytes: u64) -> Self {
        self.segment_bytes = segment_bytes;
        self
    }

    pub fn with_keep_window(mut self, seconds: f64) -> Self {
        self.keep_window_secs = seconds;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.segment_bytes == 0 {
            return Err(PlaybackError::InvalidConfig(
                "segment_bytes must be > 0".to_string(),
            ));
        }

        if !self.keep_window_secs.is_finite() || self.keep_window_secs <= 0.0 {
            return Err(PlaybackError::InvalidConfig(
                "keep_window_secs must be a positive number".to_string(),
            ));
        }

        if !self.safety_margin_secs.is_finite() || self.safety_margin_secs < 0.0 {
            return Err(PlaybackError::InvalidConfig(
                "safety_margin_secs cannot be negative".to_string(),
            ));
        }

        if self.mime_type.trim().is_empty() {
            return Err(PlaybackError::InvalidConfig(
                "mime_type cannot be empty".to_string(),
            ));
        }

        for (name, path) in [
            ("stream_path", &self.stream_path),
            ("clear_cache_path", &self.clear_cache_path),
        ] {
            if !path.starts_with('/') {
                return Err(PlaybackError::InvalidConfig(format!(
                    "{} must start with '/'",
                    name
                )));
            }
        }

        Ok(())
    }

    /// `<base>/stream`
    pub fn stream_endpoint(&self) -> String {
        join_url(&self.base_url, &self.stream_path)
    }

    /// `<base>/clear-cache`
    pub fn clear_cache_endpoint(&self) -> String {
        join_url(&self.base_url, &self.clear_cache_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_base_url() -> String {
    "/api".to_string()
}

fn default_segment_bytes() -> u64 {
    256 * 1024
}

fn default_keep_window_secs() -> f64 {
    30.0
}

fn default_safety_margin_secs() -> f64 {
    5.0
}

fn default_mime_type() -> String {
    DEFAULT_MIME_TYPE.to_string()
}

fn default_stream_path() -> String {
    "/stream".to_string()
}

fn default_clear_cache_path() -> String {
    "/clear-cache".to_string()
}
