//! `MediaSource` backed audio output.
//!
//! [`MseMediaHost`] wraps one `<audio>` element. Each call to
//! [`MediaHost::open_buffer`] creates a fresh `MediaSource`, points the
//! element at its object URL, waits for `sourceopen` and adds a
//! `SourceBuffer`. Appends and removals resolve on `updateend` and fail on
//! `error`/`abort`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::media::{MediaBuffer, MediaHost, SharedMediaBuffer, TimeRange};
use bytes::Bytes;
use futures::channel::oneshot;
use js_sys::Uint8Array;
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Event, EventTarget, HtmlAudioElement, MediaSource, MediaSourceReadyState, SourceBuffer, Url};

use crate::error::{is_not_supported, WasmError};

/// Register listeners for `ok` and `fail` on `target`, run `start`, then wait
/// for whichever event fires first.
async fn settle_on(
    target: &EventTarget,
    ok: &str,
    fail: &[&str],
    start: impl FnOnce() -> Result<(), JsValue>,
) -> Result<(), WasmError> {
    let (tx, rx) = oneshot::channel::<Result<(), String>>();
    let slot = Rc::new(RefCell::new(Some(tx)));

    let listener = |outcome: Result<(), String>| {
        let slot = Rc::clone(&slot);
        Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            if let Some(tx) = slot.borrow_mut().take() {
                let _ = tx.send(outcome.clone());
            }
        })
    };

    let mut listeners = vec![(ok.to_string(), listener(Ok(())))];
    for name in fail {
        listeners.push((name.to_string(), listener(Err(format!("{name} event")))));
    }

    for (name, closure) in &listeners {
        target
            .add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())
            .map_err(|e| WasmError::js("addEventListener", e))?;
    }

    let outcome = match start() {
        Ok(()) => rx
            .await
            .unwrap_or_else(|_| Err("listener dropped".to_string())),
        Err(e) => Err(crate::error::js_message(&e)),
    };

    for (name, closure) in &listeners {
        let _ = target.remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
    }

    outcome.map_err(WasmError::MediaSource)
}

// =============================================================================
// Host
// =============================================================================

/// The page's audio output.
pub struct MseMediaHost {
    audio: HtmlAudioElement,
}

impl MseMediaHost {
    pub fn new(audio: HtmlAudioElement) -> Self {
        Self { audio }
    }
}

#[async_trait(?Send)]
impl MediaHost for MseMediaHost {
    fn supports_buffering(&self) -> bool {
        web_sys::window()
            .and_then(|w| js_sys::Reflect::get(&w, &JsValue::from_str("MediaSource")).ok())
            .map_or(false, |ctor| ctor.is_function())
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.supports_buffering() && MediaSource::is_type_supported(mime_type)
    }

    async fn open_buffer(&self, mime_type: &str) -> BridgeResult<SharedMediaBuffer> {
        let source = MediaSource::new().map_err(|e| WasmError::js("new MediaSource", e))?;
        let url = Url::create_object_url_with_source(&source)
            .map_err(|e| WasmError::js("createObjectURL", e))?;

        let audio = self.audio.clone();
        let object_url = url.clone();
        settle_on(&source, "sourceopen", &["sourceclose"], move || {
            audio.set_src(&object_url);
            Ok(())
        })
        .await?;

        let buffer = source.add_source_buffer(mime_type).map_err(|e| {
            if is_not_supported(&e) {
                WasmError::Unsupported(mime_type.to_string())
            } else {
                WasmError::js("addSourceBuffer", e)
            }
        })?;

        debug!(mime_type, url = %url, "SourceBuffer attached");
        Ok(Arc::new(MseBuffer {
            audio: self.audio.clone(),
            source,
            buffer,
            url,
            detached: Cell::new(false),
        }))
    }

    fn set_source_url(&self, url: &str) -> BridgeResult<()> {
        self.audio.set_src(url);
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.audio.current_time()
    }

    async fn play(&self) -> BridgeResult<()> {
        let promise = self
            .audio
            .play()
            .map_err(|e| WasmError::js("audio.play", e))?;
        JsFuture::from(promise)
            .await
            .map_err(|e| WasmError::js("audio.play", e))?;
        Ok(())
    }

    fn pause(&self) -> BridgeResult<()> {
        self.audio
            .pause()
            .map_err(|e| WasmError::js("audio.pause", e).into())
    }
}

// =============================================================================
// Buffer
// =============================================================================

/// One `MediaSource` + `SourceBuffer` pair.
pub struct MseBuffer {
    audio: HtmlAudioElement,
    source: MediaSource,
    buffer: SourceBuffer,
    url: String,
    detached: Cell<bool>,
}

impl MseBuffer {
    fn ensure_attached(&self) -> BridgeResult<()> {
        if self.detached.get() {
            return Err(BridgeError::InvalidState("buffer detached".to_string()));
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl MediaBuffer for MseBuffer {
    fn is_updating(&self) -> bool {
        self.buffer.updating()
    }

    fn buffered(&self) -> Option<TimeRange> {
        if self.detached.get() {
            return None;
        }
        let ranges = self.buffer.buffered().ok()?;
        if ranges.length() == 0 {
            return None;
        }
        Some(TimeRange::new(ranges.start(0).ok()?, ranges.end(0).ok()?))
    }

    async fn append(&self, data: Bytes) -> BridgeResult<()> {
        self.ensure_attached()?;
        if self.buffer.updating() {
            return Err(BridgeError::InvalidState("SourceBuffer is updating".to_string()));
        }

        let array = Uint8Array::from(data.as_ref());
        let buffer = self.buffer.clone();
        settle_on(&self.buffer, "updateend", &["error", "abort"], move || {
            buffer.append_buffer_with_array_buffer_view(&array)
        })
        .await?;
        Ok(())
    }

    async fn remove(&self, start: f64, end: f64) -> BridgeResult<()> {
        self.ensure_attached()?;
        if self.buffer.updating() {
            return Err(BridgeError::InvalidState("SourceBuffer is updating".to_string()));
        }

        let buffer = self.buffer.clone();
        settle_on(&self.buffer, "updateend", &["error", "abort"], move || {
            buffer.remove(start, end)
        })
        .await?;
        Ok(())
    }

    fn end_of_stream(&self) -> BridgeResult<()> {
        self.ensure_attached()?;
        if self.source.ready_state() != MediaSourceReadyState::Open || self.buffer.updating() {
            return Err(BridgeError::InvalidState(
                "MediaSource not ready for endOfStream".to_string(),
            ));
        }
        self.source
            .end_of_stream()
            .map_err(|e| WasmError::js("endOfStream", e).into())
    }

    fn detach(&self) -> BridgeResult<()> {
        if self.detached.replace(true) {
            return Ok(());
        }

        if self.source.ready_state() == MediaSourceReadyState::Open {
            if let Err(e) = self.source.remove_source_buffer(&self.buffer) {
                warn!(error = %crate::error::js_message(&e), "removeSourceBuffer failed");
            }
        }

        // A newer session may already own the element.
        if self.audio.src() == self.url {
            let _ = self.audio.remove_attribute("src");
            self.audio.load();
        }

        Url::revoke_object_url(&self.url).map_err(|e| WasmError::js("revokeObjectURL", e).into())
    }
}
