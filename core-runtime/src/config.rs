//! # Engine Configuration Module
//!
//! Capability injection for the playback engine.
//!
//! ## Overview
//!
//! An [`EngineConfig`] holds the host bridges the engine runs against. The
//! builder validates them up front so a misconfigured host fails at startup
//! instead of on the first `start_track`.
//!
//! ## Required Dependencies
//!
//! - `MediaHost` - The audio output and its decode buffers
//! - `HttpClient` - Byte-range segment requests (desktop default: reqwest)
//!
//! ## Optional Dependencies
//!
//! - `CacheInvalidator` - Defaults to a no-op for hosts without a segment cache
//! - `EventBus` - A fresh bus is created when none is supplied
//!
//! With the `desktop-shims` feature, a reqwest-backed `HttpClient` is
//! injected automatically when none is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::EngineConfig;
//! use std::sync::Arc;
//!
//! let config = EngineConfig::builder()
//!     .media_host(Arc::new(MyAudioOutput::new()))
//!     .http_client(Arc::new(MyHttpClient))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::{EventBus, DEFAULT_EVENT_BUFFER_SIZE};
use bridge_traits::{CacheInvalidator, HttpClient, MediaHost, NoopInvalidator};
use std::sync::Arc;

/// Host capabilities the engine is built from.
///
/// Use [`EngineConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct EngineConfig {
    pub http_client: Arc<dyn HttpClient>,

    pub media_host: Arc<dyn MediaHost>,

    /// Told to drop a track's cached segments when it is left
    pub cache_invalidator: Arc<dyn CacheInvalidator>,

    pub event_bus: EventBus,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("media_host", &"MediaHost { ... }")
            .field("cache_invalidator", &"CacheInvalidator { ... }")
            .field("event_bus", &self.event_bus)
            .finish()
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

fn media_host_missing_error() -> Error {
    Error::missing(
        "MediaHost",
        "MediaHost implementation is required for audio output. \
         Web: inject bridge_wasm::MseMediaHost bound to an <audio> element. \
         Other hosts: wrap the native audio output.",
    )
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new()
        .map_err(|e| Error::Config(format!("Default HTTP client unavailable: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::missing(
        "HttpClient",
        "HttpClient implementation is required for segment requests. \
         Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
         Web: inject bridge_wasm::WasmHttpClient.",
    ))
}

/// Builder for [`EngineConfig`].
#[derive(Default)]
pub struct EngineConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    media_host: Option<Arc<dyn MediaHost>>,
    cache_invalidator: Option<Arc<dyn CacheInvalidator>>,
    event_bus: Option<EventBus>,
    event_buffer_size: Option<usize>,
}

impl EngineConfigBuilder {
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn media_host(mut self, host: Arc<dyn MediaHost>) -> Self {
        self.media_host = Some(host);
        self
    }

    pub fn cache_invalidator(mut self, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        self.cache_invalidator = Some(invalidator);
        self
    }

    /// Share an existing bus instead of creating one.
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Capacity of the bus created when none is supplied.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `EngineConfig`.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when `MediaHost` is absent, or
    ///   `HttpClient` is absent and no desktop default is compiled in
    /// - [`Error::Config`] when the event buffer size is zero
    pub fn build(self) -> Result<EngineConfig> {
        let media_host = self.media_host.ok_or_else(media_host_missing_error)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let event_bus = match (self.event_bus, self.event_buffer_size) {
            (Some(bus), _) => bus,
            (None, Some(0)) => {
                return Err(Error::Config(
                    "Event buffer size must be greater than 0".to_string(),
                ))
            }
            (None, size) => EventBus::new(size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE)),
        };

        Ok(EngineConfig {
            http_client,
            media_host,
            cache_invalidator: self
                .cache_invalidator
                .unwrap_or_else(|| Arc::new(NoopInvalidator)),
            event_bus,
        })
    }
}
