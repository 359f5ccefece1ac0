//! WebAssembly Bridge Implementations
//!
//! Browser implementations of the capabilities defined in `bridge-traits`,
//! built on `web-sys` and `wasm-bindgen`.
//!
//! # Platform Support
//!
//! This crate targets `wasm32-unknown-unknown` only; on other targets it
//! compiles to nothing.
//!
//! # Implementations
//!
//! - [`WasmHttpClient`]: `fetch` with `Range` headers and abortable timeouts
//! - [`MseMediaHost`]: `<audio>` output fed through `MediaSource`/`SourceBuffer`
//! - [`ServiceWorkerInvalidator`]: `CLEAR_TRACK` messages to the controlling
//!   service worker, with a fallback transport

#![cfg(target_arch = "wasm32")]

pub mod error;
pub mod http;
pub mod media;
pub mod worker;

pub use error::{WasmError, WasmResult};
pub use http::WasmHttpClient;
pub use media::{MseBuffer, MseMediaHost};
pub use worker::ServiceWorkerInvalidator;
