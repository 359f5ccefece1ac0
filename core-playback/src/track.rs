//! Track references, byte ranges and fetched segments.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifiers the backend needs to locate a track's audio.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackRef {
    pub id: String,
    pub src: String,
}

impl TrackRef {
    pub fn new(id: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            src: src.into(),
        }
    }
}

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Inclusive byte range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(end >= start, "byte range end before start");
        Self { start, end }
    }

    /// Window of `len` bytes beginning at `start`. `len` must be non-zero.
    pub fn window(start: u64, len: u64) -> Self {
        Self::new(start, start + len.max(1) - 1)
    }

    /// Bytes covered; at least one, since both ends are inclusive.
    pub fn byte_count(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value of the `Range` request header.
    pub fn to_header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Bytes returned for one segment request.
#[derive(Debug, Clone)]
pub struct Segment {
    /// The range that was requested.
    pub requested: ByteRange,
    pub data: Bytes,
    /// HTTP status the segment arrived with (200 or 206).
    pub status: u16,
    /// Full resource length from `Content-Range`, when the server sent one.
    pub total_length: Option<u64>,
}

impl Segment {
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Offset the next request should start at.
    pub fn next_offset(&self) -> u64 {
        self.requested.start + self.len()
    }

    /// Whether no further segment exists after this one.
    ///
    /// A 200 response carries everything from the requested start onward, a
    /// short body means the resource ran out, and a known total tells us
    /// directly.
    pub fn is_last(&self) -> bool {
        if self.is_empty() || self.status == 200 || self.len() < self.requested.byte_count() {
            return true;
        }
        self.total_length
            .map_or(false, |total| self.next_offset() >= total)
    }
}

/// Parse the total from `Content-Range: bytes <start>-<end>/<total>`.
///
/// Returns `None` for a missing or `*` total.
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (_, total) = rest.split_once('/')?;
    total.trim().parse().ok()
}
