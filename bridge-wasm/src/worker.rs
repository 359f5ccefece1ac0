//! Service-worker cache invalidation.

use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::cache::{CacheInvalidator, WorkerMessage};
use bridge_traits::error::Result as BridgeResult;
use tracing::debug;
use web_sys::ServiceWorker;

use crate::error::WasmError;

/// Posts `{ type: "CLEAR_TRACK", trackId }` to the service worker that
/// controls the page. Pages without a controlling worker use `fallback`.
pub struct ServiceWorkerInvalidator {
    fallback: Arc<dyn CacheInvalidator>,
}

impl ServiceWorkerInvalidator {
    pub fn new(fallback: Arc<dyn CacheInvalidator>) -> Self {
        Self { fallback }
    }

    fn controller() -> Option<ServiceWorker> {
        web_sys::window()?.navigator().service_worker().controller()
    }
}

#[async_trait(?Send)]
impl CacheInvalidator for ServiceWorkerInvalidator {
    async fn invalidate(&self, track_id: &str) -> BridgeResult<()> {
        let Some(worker) = Self::controller() else {
            debug!(track_id, "No controlling service worker, using fallback");
            return self.fallback.invalidate(track_id).await;
        };

        let message = serde_wasm_bindgen::to_value(&WorkerMessage::clear_track(track_id))
            .map_err(WasmError::from)?;
        worker
            .post_message(&message)
            .map_err(|e| WasmError::js("postMessage", e))?;

        debug!(track_id, "CLEAR_TRACK posted to service worker");
        Ok(())
    }
}
