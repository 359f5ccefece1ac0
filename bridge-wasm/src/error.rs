//! Error types for WebAssembly bridge implementations

use bridge_traits::error::BridgeError;
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

/// Result type for WebAssembly bridge operations
pub type WasmResult<T> = Result<T, WasmError>;

/// Errors raised while driving browser APIs.
#[derive(Error, Debug)]
pub enum WasmError {
    /// JavaScript exception from web-sys
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    /// A browser global (window, navigator, ...) is missing
    #[error("Browser API not available: {0}")]
    NotAvailable(String),

    /// The media pipeline refused a MIME type
    #[error("Unsupported media type: {0}")]
    Unsupported(String),

    /// A media object fired its failure event
    #[error("Media source error: {0}")]
    MediaSource(String),

    /// Value could not be converted to or from JavaScript
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl WasmError {
    /// Wrap a JavaScript exception with the call that raised it.
    pub fn js(context: &str, value: JsValue) -> Self {
        WasmError::JavaScript(format!("{context}: {}", js_message(&value)))
    }
}

impl From<WasmError> for BridgeError {
    fn from(err: WasmError) -> Self {
        match err {
            WasmError::NotAvailable(what) => BridgeError::NotAvailable(what),
            WasmError::Unsupported(mime) => BridgeError::Unsupported(mime),
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

impl From<JsValue> for WasmError {
    fn from(js_value: JsValue) -> Self {
        WasmError::JavaScript(js_message(&js_value))
    }
}

impl From<serde_wasm_bindgen::Error> for WasmError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        WasmError::Serialization(err.to_string())
    }
}

/// Best-effort human readable text for a thrown JavaScript value.
pub(crate) fn js_message(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        text
    } else if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        let name: String = error.name().into();
        let message: String = error.message().into();
        format!("{name}: {message}")
    } else {
        format!("{:?}", value)
    }
}

/// `true` for `DOMException`s named `NotSupportedError`.
pub(crate) fn is_not_supported(value: &JsValue) -> bool {
    value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.name()) == "NotSupportedError")
        .unwrap_or(false)
}
