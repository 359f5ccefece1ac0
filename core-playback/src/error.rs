//! # Playback Error Types
//!
//! Error types for segment fetching, decode-buffer management and the
//! engine's command surface.

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Streaming Errors
    // ========================================================================
    /// Segment request completed with a status other than 200/206.
    #[error("Segment request failed with HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Network streaming failed before a response arrived.
    #[error("Streaming failed: {0}")]
    StreamingFailed(String),

    // ========================================================================
    // Format/Codec Errors
    // ========================================================================
    /// The runtime cannot decode the configured MIME type.
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    // ========================================================================
    // Buffer Errors
    // ========================================================================
    /// The decode buffer rejected an operation.
    #[error("Decode buffer error: {0}")]
    BufferError(String),

    /// The decode buffer was already closed.
    #[error("Decode buffer closed")]
    BufferClosed,

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// The engine loop has shut down; the handle can no longer deliver commands.
    #[error("Playback engine closed")]
    EngineClosed,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::StreamingFailed(_) => true,
            PlaybackError::HttpStatus { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            _ => false,
        }
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::StreamingFailed(_) | PlaybackError::HttpStatus { .. }
        )
    }

    /// Returns `true` if this error is related to audio format/codec issues.
    pub fn is_format_error(&self) -> bool {
        matches!(self, PlaybackError::UnsupportedCodec(_))
    }

    /// Map a failed decode-buffer call.
    pub(crate) fn from_buffer(err: BridgeError) -> Self {
        match err {
            BridgeError::Unsupported(mime) => PlaybackError::UnsupportedCodec(mime),
            other => PlaybackError::BufferError(other.to_string()),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let timeout = PlaybackError::StreamingFailed("timed out".to_string());
        assert!(timeout.is_transient());
        assert!(timeout.is_network_error());

        let not_found = PlaybackError::HttpStatus {
            status: 404,
            url: "/api/stream".to_string(),
        };
        assert!(!not_found.is_transient());
        assert!(not_found.is_network_error());

        let unavailable = PlaybackError::HttpStatus {
            status: 503,
            url: "/api/stream".to_string(),
        };
        assert!(unavailable.is_transient());

        let codec = PlaybackError::UnsupportedCodec("audio/webm".to_string());
        assert!(codec.is_format_error());
        assert!(!codec.is_network_error());
    }

    #[test]
    fn test_buffer_error_mapping() {
        let err = PlaybackError::from_buffer(BridgeError::Unsupported("audio/x-foo".to_string()));
        assert!(matches!(err, PlaybackError::UnsupportedCodec(ref m) if m == "audio/x-foo"));

        let err = PlaybackError::from_buffer(BridgeError::InvalidState("updating".to_string()));
        assert!(matches!(err, PlaybackError::BufferError(_)));
    }
}
