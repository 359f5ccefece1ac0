//! # Host Bridge Traits
//!
//! Platform abstraction traits that each host must implement for the
//! playback engine.
//!
//! ## Overview
//!
//! This crate defines the contract between the engine and the platform. Each
//! trait represents a capability the engine needs but that is implemented
//! differently per platform (desktop, web).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP for byte-range segment requests
//!
//! ### Media Output
//! - [`MediaHost`](media::MediaHost) - The audio output: buffering support, play/pause, clock
//! - [`MediaBuffer`](media::MediaBuffer) - One opened decode buffer (append/remove/detach)
//!
//! ### Cache Coordination
//! - [`CacheInvalidator`](cache::CacheInvalidator) - Drop cached segments of a track
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Capabilities |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | `HttpClient` |
//! | Web      | `bridge-wasm`       | `HttpClient`, `MediaHost`, `CacheInvalidator` |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors (reqwest errors, `JsValue` exceptions) into
//! it with an actionable message.
//!
//! ## Thread Safety
//!
//! On native targets every trait requires `Send + Sync`; on `wasm32` the
//! bounds disappear (see [`platform`]).

pub mod cache;
pub mod error;
pub mod http;
pub mod logging;
pub mod media;
pub mod platform;

pub use error::BridgeError;

pub use cache::{CacheInvalidator, NoopInvalidator, WorkerMessage};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media::{MediaBuffer, MediaHost, SharedMediaBuffer, TimeRange};
pub use platform::{PlatformFuture, PlatformSendSync};
