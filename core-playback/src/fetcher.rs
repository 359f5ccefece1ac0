//! Byte-range segment requests against the streaming backend.

use std::sync::Arc;

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_runtime::logging::redact_if_sensitive;
use tracing::{debug, instrument, warn};

use crate::config::StreamingConfig;
use crate::error::{PlaybackError, Result};
use crate::track::{parse_content_range_total, ByteRange, Segment, TrackRef};

/// Issues `GET <base>/stream?track=<id>&src=<src>` with a `Range` header.
///
/// 200 and 206 are success; every other status and every transport error is
/// a failure. Nothing is retried here.
#[derive(Clone)]
pub struct SegmentFetcher {
    http: Arc<dyn HttpClient>,
    endpoint: String,
    segment_bytes: u64,
}

impl SegmentFetcher {
    pub fn new(http: Arc<dyn HttpClient>, config: &StreamingConfig) -> Self {
        Self {
            http,
            endpoint: config.stream_endpoint(),
            segment_bytes: config.segment_bytes,
        }
    }

    pub fn segment_bytes(&self) -> u64 {
        self.segment_bytes
    }

    /// The segment window starting at `offset`.
    pub fn window_at(&self, offset: u64) -> ByteRange {
        ByteRange::window(offset, self.segment_bytes)
    }

    /// Stream URL with URL-encoded query values.
    ///
    /// Also used as the direct source when the host cannot buffer.
    pub fn stream_url(&self, track: &TrackRef) -> String {
        format!(
            "{}?track={}&src={}",
            self.endpoint,
            urlencoding::encode(&track.id),
            urlencoding::encode(&track.src)
        )
    }

    /// Fetch `range` (inclusive) of `track`.
    #[instrument(skip(self, track), fields(track_id = %track.id, range = %range))]
    pub async fn fetch(&self, track: &TrackRef, range: ByteRange) -> Result<Segment> {
        let url = self.stream_url(track);
        let request = HttpRequest::new(HttpMethod::Get, url.clone()).range(range.start, range.end);

        let response = self.http.execute(request).await.map_err(|e| {
            warn!(error = %e, "Segment request failed");
            PlaybackError::StreamingFailed(e.to_string())
        })?;

        if response.status != 200 && response.status != 206 {
            warn!(status = response.status, "Segment request rejected");
            return Err(PlaybackError::HttpStatus {
                status: response.status,
                url: redact_if_sensitive("url", &url),
            });
        }

        let total_length = response
            .header("Content-Range")
            .and_then(parse_content_range_total);

        debug!(
            status = response.status,
            bytes = response.body.len(),
            total = ?total_length,
            "Segment received"
        );

        Ok(Segment {
            requested: range,
            data: response.body,
            status: response.status,
            total_length,
        })
    }
}

impl std::fmt::Debug for SegmentFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentFetcher")
            .field("endpoint", &self.endpoint)
            .field("segment_bytes", &self.segment_bytes)
            .finish()
    }
}
