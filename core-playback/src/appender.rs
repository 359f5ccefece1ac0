//! Exclusive owner of a session's decode buffer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bridge_traits::media::{MediaHost, SharedMediaBuffer, TimeRange};
use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{PlaybackError, Result};
use crate::eviction::EvictionPolicy;

/// Serializes access to one decode buffer.
///
/// Callers must not issue an append while another append or removal is
/// pending; the session's guard flags enforce that, this type does not.
/// Clones share the same buffer and closed flag.
#[derive(Clone)]
pub struct BufferAppender {
    host: Arc<dyn MediaHost>,
    buffer: SharedMediaBuffer,
    eviction: EvictionPolicy,
    closed: Arc<AtomicBool>,
}

impl BufferAppender {
    /// Wrap an already-opened buffer.
    pub fn new(host: Arc<dyn MediaHost>, buffer: SharedMediaBuffer, eviction: EvictionPolicy) -> Self {
        Self {
            host,
            buffer,
            eviction,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Open a decode buffer for `mime_type` on `host`.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::UnsupportedCodec`] when the host cannot decode the
    /// type; any other buffer failure maps to [`PlaybackError::BufferError`].
    pub async fn open(
        host: Arc<dyn MediaHost>,
        mime_type: &str,
        eviction: EvictionPolicy,
    ) -> Result<Self> {
        if !host.is_type_supported(mime_type) {
            return Err(PlaybackError::UnsupportedCodec(mime_type.to_string()));
        }

        let buffer = host
            .open_buffer(mime_type)
            .await
            .map_err(PlaybackError::from_buffer)?;

        debug!(mime_type, "Decode buffer opened");
        Ok(Self::new(host, buffer, eviction))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Ready for the next append: open and not mid-update.
    pub fn is_ready(&self) -> bool {
        !self.is_closed() && !self.buffer.is_updating()
    }

    pub fn buffered(&self) -> Option<TimeRange> {
        self.buffer.buffered()
    }

    /// Append encoded bytes; resolves when the buffer finishes the update.
    pub async fn append(&self, data: Bytes) -> Result<()> {
        if self.is_closed() {
            return Err(PlaybackError::BufferClosed);
        }
        self.buffer
            .append(data)
            .await
            .map_err(PlaybackError::from_buffer)
    }

    /// Drop played media older than the retention window.
    ///
    /// Best effort: returns the removed range, or `None` when nothing was
    /// removed or the removal failed. Failures are logged only.
    pub async fn trim(&self, keep_window_secs: f64) -> Option<TimeRange> {
        if self.is_closed() {
            return None;
        }

        let buffered = self.buffer.buffered()?;
        let position = self.host.current_time();
        let (start, end) = self
            .eviction
            .decide(buffered.start, position, keep_window_secs)?;

        match self.buffer.remove(start, end).await {
            Ok(()) => {
                debug!(start, end, position, "Evicted played media");
                Some(TimeRange::new(start, end))
            }
            Err(e) => {
                warn!(error = %e, start, end, "Eviction rejected by decode buffer");
                None
            }
        }
    }

    /// Signal that the final segment has been appended.
    pub fn end_of_stream(&self) -> Result<()> {
        if self.is_closed() {
            return Err(PlaybackError::BufferClosed);
        }
        self.buffer
            .end_of_stream()
            .map_err(PlaybackError::from_buffer)
    }

    /// Detach the buffer from the output and release it.
    ///
    /// Idempotent; errors are logged and swallowed.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.buffer.detach() {
            warn!(error = %e, "Failed to detach decode buffer");
        }
    }
}

impl std::fmt::Debug for BufferAppender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferAppender")
            .field("closed", &self.is_closed())
            .field("eviction", &self.eviction)
            .finish()
    }
}
