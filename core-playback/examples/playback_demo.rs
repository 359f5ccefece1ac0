//! # Segmented Playback Demo
//!
//! Streams a synthetic track through the engine using an in-memory server
//! and a console "audio output".
//!
//! Run with: `cargo run --example playback_demo --package core-playback`

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::media::{MediaBuffer, MediaHost, SharedMediaBuffer, TimeRange};
use bytes::Bytes;
use core_playback::{PlayerEngine, Result, StreamingConfig, TrackRef};
use core_runtime::config::EngineConfig;
use core_runtime::events::{CoreEvent, PlaybackEvent};

// ============================================================================
// In-memory server
// ============================================================================

/// Serves one 700 KB body for every track.
struct DemoServer {
    body: Bytes,
}

#[async_trait]
impl HttpClient for DemoServer {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let total = self.body.len() as u64;
        let (start, end) = request
            .headers
            .get("Range")
            .and_then(|v| v.strip_prefix("bytes="))
            .and_then(|v| v.split_once('-'))
            .and_then(|(s, e)| Some((s.parse::<u64>().ok()?, e.parse::<u64>().ok()?)))
            .unwrap_or((0, total - 1));
        let end = end.min(total - 1);

        tokio::time::sleep(Duration::from_millis(30)).await;

        let mut headers = HashMap::new();
        headers.insert(
            "Content-Range".to_string(),
            format!("bytes {}-{}/{}", start, end, total),
        );
        Ok(HttpResponse {
            status: 206,
            headers,
            body: self.body.slice(start as usize..=end as usize),
        })
    }
}

// ============================================================================
// Console output
// ============================================================================

#[derive(Default)]
struct ConsoleBuffer {
    seconds: Mutex<f64>,
}

#[async_trait]
impl MediaBuffer for ConsoleBuffer {
    fn is_updating(&self) -> bool {
        false
    }

    fn buffered(&self) -> Option<TimeRange> {
        Some(TimeRange::new(0.0, *self.seconds.lock().unwrap()))
    }

    async fn append(&self, data: Bytes) -> BridgeResult<()> {
        // ~128 kbit/s
        *self.seconds.lock().unwrap() += data.len() as f64 / 16_000.0;
        Ok(())
    }

    async fn remove(&self, start: f64, end: f64) -> BridgeResult<()> {
        println!("   evicting {:.1}s..{:.1}s", start, end);
        Ok(())
    }

    fn end_of_stream(&self) -> BridgeResult<()> {
        Ok(())
    }

    fn detach(&self) -> BridgeResult<()> {
        println!("   buffer detached");
        Ok(())
    }
}

struct ConsoleHost;

#[async_trait]
impl MediaHost for ConsoleHost {
    fn supports_buffering(&self) -> bool {
        true
    }

    fn is_type_supported(&self, _mime_type: &str) -> bool {
        true
    }

    async fn open_buffer(&self, mime_type: &str) -> BridgeResult<SharedMediaBuffer> {
        println!("   opening decode buffer for {}", mime_type);
        Ok(Arc::new(ConsoleBuffer::default()))
    }

    fn set_source_url(&self, url: &str) -> BridgeResult<()> {
        println!("   direct source {}", url);
        Ok(())
    }

    fn current_time(&self) -> f64 {
        0.0
    }

    async fn play(&self) -> BridgeResult<()> {
        println!("   ▶ play");
        Ok(())
    }

    fn pause(&self) -> BridgeResult<()> {
        println!("   ⏸ pause");
        Ok(())
    }
}

// ============================================================================
// Main Demo
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    println!("Segmented playback demo\n");

    let config = EngineConfig::builder()
        .http_client(Arc::new(DemoServer {
            body: Bytes::from(vec![0u8; 700_000]),
        }))
        .media_host(Arc::new(ConsoleHost))
        .build()?;

    let (engine, handle) = PlayerEngine::new(config, StreamingConfig::default())?;
    let mut events = handle.subscribe();
    let engine = tokio::spawn(engine.run());

    handle.start_track(TrackRef::new("demo-1", "https://example.com/watch?v=demo"))?;

    while let Ok(event) = events.recv().await {
        println!("[{:?}] {}", event.severity(), event.description());
        if let CoreEvent::Playback(PlaybackEvent::SegmentAppended { start, end, .. }) = &event {
            println!("   bytes {}-{}", start, end);
        }
        if matches!(event, CoreEvent::Playback(PlaybackEvent::EndOfStream { .. })) {
            break;
        }
    }

    handle.close_track()?;
    drop(handle);
    engine.await.ok();

    println!("\nDone");
    Ok(())
}
