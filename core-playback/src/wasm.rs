//! WebAssembly bindings for the player.
//!
//! Wires the browser bridges from `bridge-wasm` into a [`PlayerEngine`]
//! running on the page's event loop and exposes the UI commands to
//! JavaScript.

use std::sync::Arc;

use bridge_traits::cache::CacheInvalidator;
use bridge_traits::http::HttpClient;
use bridge_traits::logging::LogLevel;
use bridge_traits::media::MediaHost;
use bridge_wasm::{MseMediaHost, ServiceWorkerInvalidator, WasmHttpClient};
use core_runtime::config::EngineConfig;
use core_runtime::events::RecvError;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use wasm_bindgen::prelude::*;
use web_sys::HtmlAudioElement;

use crate::config::StreamingConfig;
use crate::engine::{PlayerEngine, PlayerHandle};
use crate::invalidation::HttpCacheInvalidator;
use crate::track::TrackRef;

#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Route `tracing` output to the browser console.
#[wasm_bindgen(js_name = enableConsoleLogging)]
pub fn enable_console_logging(verbose: bool) {
    let level = if verbose { LogLevel::Debug } else { LogLevel::Info };
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(level);

    if init_logging(config).is_err() {
        web_sys::console::warn_1(&"console logging already enabled".into());
    }
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// =============================================================================
// Player
// =============================================================================

/// Player bound to one `<audio>` element.
#[wasm_bindgen]
pub struct WasmPlayer {
    handle: PlayerHandle,
}

#[wasm_bindgen]
impl WasmPlayer {
    /// Create a player and start its engine on the page's event loop.
    ///
    /// `baseUrl` defaults to `/api`. Cache invalidation goes to the active
    /// service worker when one controls the page, otherwise to the server.
    #[wasm_bindgen(constructor)]
    pub fn new(audio: HtmlAudioElement, base_url: Option<String>) -> Result<WasmPlayer, JsValue> {
        let mut streaming = StreamingConfig::default();
        if let Some(base_url) = base_url {
            streaming = streaming.with_base_url(base_url);
        }

        let http: Arc<dyn HttpClient> = Arc::new(WasmHttpClient::new().map_err(to_js)?);
        let host: Arc<dyn MediaHost> = Arc::new(MseMediaHost::new(audio));
        let fallback: Arc<dyn CacheInvalidator> =
            Arc::new(HttpCacheInvalidator::new(Arc::clone(&http), &streaming));
        let invalidator: Arc<dyn CacheInvalidator> =
            Arc::new(ServiceWorkerInvalidator::new(fallback));

        let config = EngineConfig::builder()
            .http_client(http)
            .media_host(host)
            .cache_invalidator(invalidator)
            .build()
            .map_err(to_js)?;

        let (engine, handle) = PlayerEngine::new(config, streaming).map_err(to_js)?;
        wasm_bindgen_futures::spawn_local(engine.run());

        Ok(WasmPlayer { handle })
    }

    #[wasm_bindgen(js_name = startTrack)]
    pub fn start_track(&self, track_id: String, src: String) -> Result<(), JsValue> {
        self.handle
            .start_track(TrackRef::new(track_id, src))
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = nextTrack)]
    pub fn next_track(&self, track_id: String, src: String) -> Result<(), JsValue> {
        self.handle
            .next_track(TrackRef::new(track_id, src))
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = prevTrack)]
    pub fn prev_track(&self, track_id: String, src: String) -> Result<(), JsValue> {
        self.handle
            .prev_track(TrackRef::new(track_id, src))
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = pauseTrack)]
    pub fn pause_track(&self) -> Result<(), JsValue> {
        self.handle.pause_track().map_err(to_js)
    }

    #[wasm_bindgen(js_name = resumeTrack)]
    pub fn resume_track(&self) -> Result<(), JsValue> {
        self.handle.resume_track().map_err(to_js)
    }

    #[wasm_bindgen(js_name = closeTrack)]
    pub fn close_track(&self) -> Result<(), JsValue> {
        self.handle.close_track().map_err(to_js)
    }

    #[wasm_bindgen(js_name = toggleRepeat)]
    pub fn toggle_repeat(&self) -> Result<(), JsValue> {
        self.handle.toggle_repeat().map_err(to_js)
    }

    /// Call `callback` with every engine event as a plain JS object.
    #[wasm_bindgen(js_name = onEvent)]
    pub fn on_event(&self, callback: js_sys::Function) {
        let mut events = self.handle.subscribe();
        wasm_bindgen_futures::spawn_local(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Ok(value) = serde_wasm_bindgen::to_value(&event) else {
                            continue;
                        };
                        if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                            web_sys::console::error_2(&"event callback threw".into(), &e);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }
}
