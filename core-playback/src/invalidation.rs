//! HTTP transport for cache invalidation.

use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::cache::CacheInvalidator;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use tracing::debug;

use crate::config::StreamingConfig;

/// Sends `POST <base>/clear-cache/<trackId>`; the response body is ignored.
#[derive(Clone)]
pub struct HttpCacheInvalidator {
    http: Arc<dyn HttpClient>,
    endpoint: String,
}

impl HttpCacheInvalidator {
    pub fn new(http: Arc<dyn HttpClient>, config: &StreamingConfig) -> Self {
        Self {
            http,
            endpoint: config.clear_cache_endpoint(),
        }
    }

    pub fn url_for(&self, track_id: &str) -> String {
        format!("{}/{}", self.endpoint, urlencoding::encode(track_id))
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl CacheInvalidator for HttpCacheInvalidator {
    async fn invalidate(&self, track_id: &str) -> Result<()> {
        let url = self.url_for(track_id);
        let response = self
            .http
            .execute(HttpRequest::new(HttpMethod::Post, url.clone()))
            .await?;

        if !response.is_success() {
            return Err(BridgeError::OperationFailed(format!(
                "POST {} returned {}",
                url, response.status
            )));
        }

        debug!(track_id, "Cache invalidation acknowledged");
        Ok(())
    }
}
