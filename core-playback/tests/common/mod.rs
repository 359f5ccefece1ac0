//! In-memory hosts shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::cache::CacheInvalidator;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::media::{MediaBuffer, MediaHost, SharedMediaBuffer, TimeRange};
use bytes::Bytes;

/// Ordered log of host and server calls shared between fakes.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Deterministic track body of `len` bytes.
pub fn track_bytes(len: usize) -> Bytes {
    Bytes::from((0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>())
}

// =============================================================================
// HTTP
// =============================================================================

/// Serves `Range` requests out of in-memory track bodies.
#[derive(Default)]
pub struct FakeServer {
    tracks: Mutex<HashMap<String, Bytes>>,
    requests: Mutex<Vec<HttpRequest>>,
    failing_status: Mutex<Option<u16>>,
    latency: Mutex<Option<Duration>>,
    journal: Mutex<Option<Journal>>,
}

impl FakeServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_track(self: Arc<Self>, id: &str, body: Bytes) -> Arc<Self> {
        self.tracks.lock().unwrap().insert(id.to_string(), body);
        self
    }

    /// Answer every stream request with `status`.
    pub fn fail_with(&self, status: u16) {
        *self.failing_status.lock().unwrap() = Some(status);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// Log every request as `GET` into `journal`.
    pub fn record_into(&self, journal: Journal) {
        *self.journal.lock().unwrap() = Some(journal);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `Range` header values of every request, in arrival order.
    pub fn ranges(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| r.headers.get("Range").cloned())
            .collect()
    }

    fn query_value(url: &str, key: &str) -> Option<String> {
        let (_, query) = url.split_once('?')?;
        query.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k == key).then(|| urlencoding::decode(v).ok().map(|v| v.into_owned()))?
        })
    }

    fn parse_range(value: &str) -> Option<(u64, u64)> {
        let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
        Some((start.parse().ok()?, end.parse().ok()?))
    }

    fn respond(status: u16, headers: HashMap<String, String>, body: Bytes) -> HttpResponse {
        HttpResponse {
            status,
            headers,
            body,
        }
    }
}

#[async_trait]
impl HttpClient for FakeServer {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(journal) = self.journal.lock().unwrap().as_ref() {
            journal.lock().unwrap().push("GET".to_string());
        }

        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(status) = *self.failing_status.lock().unwrap() {
            return Ok(Self::respond(status, HashMap::new(), Bytes::new()));
        }

        let Some(track) = Self::query_value(&request.url, "track") else {
            return Ok(Self::respond(404, HashMap::new(), Bytes::new()));
        };
        let Some(body) = self.tracks.lock().unwrap().get(&track).cloned() else {
            return Ok(Self::respond(404, HashMap::new(), Bytes::new()));
        };

        let Some((start, end)) = request.headers.get("Range").and_then(|v| Self::parse_range(v))
        else {
            return Ok(Self::respond(200, HashMap::new(), body));
        };

        let total = body.len() as u64;
        if start >= total {
            return Ok(Self::respond(416, HashMap::new(), Bytes::new()));
        }
        let last = end.min(total - 1);
        let mut headers = HashMap::new();
        headers.insert(
            "Content-Range".to_string(),
            format!("bytes {}-{}/{}", start, last, total),
        );
        Ok(Self::respond(
            206,
            headers,
            body.slice(start as usize..=last as usize),
        ))
    }
}

// =============================================================================
// Media
// =============================================================================

/// Decode buffer that records what it received.
///
/// Every appended byte counts as `secs_per_byte` seconds of media. An
/// append or removal issued while another is pending is rejected and
/// counted as an overlap.
pub struct RecordingBuffer {
    secs_per_byte: f64,
    appended: Mutex<Vec<Bytes>>,
    removed: Mutex<Vec<(f64, f64)>>,
    range: Mutex<Option<TimeRange>>,
    updating: AtomicBool,
    overlaps: AtomicU32,
    ended: AtomicBool,
    detached: AtomicU32,
}

impl RecordingBuffer {
    fn new(secs_per_byte: f64) -> Self {
        Self {
            secs_per_byte,
            appended: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
            range: Mutex::new(None),
            updating: AtomicBool::new(false),
            overlaps: AtomicU32::new(0),
            ended: AtomicBool::new(false),
            detached: AtomicU32::new(0),
        }
    }

    pub fn appended_bytes(&self) -> Vec<u8> {
        self.appended
            .lock()
            .unwrap()
            .iter()
            .flat_map(|b| b.iter().copied())
            .collect()
    }

    pub fn append_count(&self) -> usize {
        self.appended.lock().unwrap().len()
    }

    pub fn removed(&self) -> Vec<(f64, f64)> {
        self.removed.lock().unwrap().clone()
    }

    pub fn overlaps(&self) -> u32 {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    pub fn detach_count(&self) -> u32 {
        self.detached.load(Ordering::SeqCst)
    }

    fn begin_update(&self) -> Result<()> {
        if self.updating.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
            return Err(BridgeError::InvalidState("buffer is updating".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MediaBuffer for RecordingBuffer {
    fn is_updating(&self) -> bool {
        self.updating.load(Ordering::SeqCst)
    }

    fn buffered(&self) -> Option<TimeRange> {
        *self.range.lock().unwrap()
    }

    async fn append(&self, data: Bytes) -> Result<()> {
        if self.detached.load(Ordering::SeqCst) > 0 {
            return Err(BridgeError::InvalidState("detached".to_string()));
        }
        self.begin_update()?;
        tokio::task::yield_now().await;

        let secs = data.len() as f64 * self.secs_per_byte;
        {
            let mut range = self.range.lock().unwrap();
            *range = Some(match *range {
                Some(r) => TimeRange::new(r.start, r.end + secs),
                None => TimeRange::new(0.0, secs),
            });
        }
        self.appended.lock().unwrap().push(data);
        self.updating.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, start: f64, end: f64) -> Result<()> {
        self.begin_update()?;
        tokio::task::yield_now().await;

        {
            let mut range = self.range.lock().unwrap();
            if let Some(r) = *range {
                *range = Some(TimeRange::new(end.max(r.start), r.end));
            }
        }
        self.removed.lock().unwrap().push((start, end));
        self.updating.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn end_of_stream(&self) -> Result<()> {
        self.ended.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn detach(&self) -> Result<()> {
        self.detached.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Audio output that records every call and hands out [`RecordingBuffer`]s.
pub struct RecordingHost {
    buffering: bool,
    secs_per_byte: f64,
    position: Mutex<f64>,
    buffers: Mutex<Vec<Arc<RecordingBuffer>>>,
    sources: Mutex<Vec<String>>,
    plays: AtomicU32,
    pauses: AtomicU32,
    journal: Journal,
    on_open: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl RecordingHost {
    pub fn buffered() -> Arc<Self> {
        Arc::new(Self::new(true))
    }

    pub fn direct() -> Arc<Self> {
        Arc::new(Self::new(false))
    }

    fn new(buffering: bool) -> Self {
        Self {
            buffering,
            secs_per_byte: 1.0 / 16_000.0,
            position: Mutex::new(0.0),
            buffers: Mutex::new(Vec::new()),
            sources: Mutex::new(Vec::new()),
            plays: AtomicU32::new(0),
            pauses: AtomicU32::new(0),
            journal: Journal::default(),
            on_open: Mutex::new(None),
        }
    }

    pub fn set_position(&self, secs: f64) {
        *self.position.lock().unwrap() = secs;
    }

    pub fn buffers(&self) -> Vec<Arc<RecordingBuffer>> {
        self.buffers.lock().unwrap().clone()
    }

    pub fn sources(&self) -> Vec<String> {
        self.sources.lock().unwrap().clone()
    }

    pub fn plays(&self) -> u32 {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn pauses(&self) -> u32 {
        self.pauses.load(Ordering::SeqCst)
    }

    /// Calls in order: `src`, `open`, `play`, `pause`.
    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    pub fn shared_journal(&self) -> Journal {
        Arc::clone(&self.journal)
    }

    /// Run `hook` inside the next `open_buffer`, which then yields once
    /// before resolving.
    pub fn on_open(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_open.lock().unwrap() = Some(Box::new(hook));
    }

    fn record(&self, call: &str) {
        self.journal.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl MediaHost for RecordingHost {
    fn supports_buffering(&self) -> bool {
        self.buffering
    }

    fn is_type_supported(&self, _mime_type: &str) -> bool {
        self.buffering
    }

    async fn open_buffer(&self, mime_type: &str) -> Result<SharedMediaBuffer> {
        if !self.buffering {
            return Err(BridgeError::Unsupported(mime_type.to_string()));
        }
        self.record("open");
        let hook = self.on_open.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
            tokio::task::yield_now().await;
        }
        let buffer = Arc::new(RecordingBuffer::new(self.secs_per_byte));
        self.buffers.lock().unwrap().push(Arc::clone(&buffer));
        Ok(buffer)
    }

    fn set_source_url(&self, url: &str) -> Result<()> {
        self.sources.lock().unwrap().push(url.to_string());
        self.record("src");
        Ok(())
    }

    fn current_time(&self) -> f64 {
        *self.position.lock().unwrap()
    }

    async fn play(&self) -> Result<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        self.record("play");
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        self.record("pause");
        Ok(())
    }
}

// =============================================================================
// Cache
// =============================================================================

/// Records invalidated track ids.
#[derive(Default)]
pub struct RecordingInvalidator {
    calls: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingInvalidator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let invalidator = Self::default();
        invalidator.fail.store(true, Ordering::SeqCst);
        Arc::new(invalidator)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheInvalidator for RecordingInvalidator {
    async fn invalidate(&self, track_id: &str) -> Result<()> {
        self.calls.lock().unwrap().push(track_id.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("worker unavailable".to_string()));
        }
        Ok(())
    }
}
