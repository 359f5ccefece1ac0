//! # Desktop Bridge Implementations
//!
//! Native implementations of the bridge traits for macOS, Windows and Linux.
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` (connection pooling, rustls TLS)
//!
//! Desktop hosts have no media-source style decode buffer; they pair this
//! client with their own `MediaHost` or run the engine headless in tests.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new()?);
//! let config = EngineConfig::builder()
//!     .http_client(http_client)
//!     // ...
//!     .build()?;
//! ```

mod http;

pub use http::ReqwestHttpClient;
