//! WebAssembly implementation of the `HttpClient` bridge trait.
//!
//! Forwards requests to the browser's `fetch` API and converts `Response`
//! objects back into [`HttpResponse`]. Per-request headers (including
//! `Range`), bodies and timeouts are honoured; timeouts abort the request
//! through an `AbortController`.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use bytes::Bytes;
use futures::{
    future::{select, Either},
    pin_mut, FutureExt,
};
use gloo_timers::future::TimeoutFuture;
use js_sys::{try_iter, Array, Uint8Array};
use std::{collections::HashMap, time::Duration};
use tracing::trace;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Request, RequestInit, RequestMode, Response, Window};

use crate::error::WasmError;

/// HTTP client backed by `window.fetch`.
pub struct WasmHttpClient {
    window: Window,
}

impl WasmHttpClient {
    /// Create a client bound to the current browser window.
    pub fn new() -> BridgeResult<Self> {
        let window =
            web_sys::window().ok_or_else(|| BridgeError::NotAvailable("window".to_string()))?;
        Ok(Self { window })
    }

    fn build_request(
        &self,
        request: &HttpRequest,
        signal: Option<&web_sys::AbortSignal>,
    ) -> Result<Request, WasmError> {
        let init = RequestInit::new();
        init.set_method(method_to_str(request.method));
        init.set_mode(RequestMode::Cors);

        if let Some(signal) = signal {
            init.set_signal(Some(signal));
        }

        if let Some(body) = &request.body {
            let body_array = Uint8Array::from(body.as_ref());
            init.set_body(&JsValue::from(body_array));
        }

        let headers =
            web_sys::Headers::new().map_err(|err| WasmError::js("create headers", err))?;
        for (key, value) in &request.headers {
            headers
                .set(key, value)
                .map_err(|err| WasmError::js("set header", err))?;
        }
        init.set_headers(&headers);

        Request::new_with_str_and_init(&request.url, &init)
            .map_err(|err| WasmError::js("build request", err))
    }

    async fn fetch_with_timeout(
        &self,
        req: &Request,
        controller: Option<AbortController>,
        timeout: Option<Duration>,
    ) -> Result<Response, WasmError> {
        let fetch = JsFuture::from(self.window.fetch_with_request(req));

        let result = if let (Some(timeout), Some(controller)) = (timeout, controller) {
            let timeout_ms = timeout.as_millis().min(u32::MAX as u128) as u32;
            let timeout_fut = TimeoutFuture::new(timeout_ms).map(|_| ());
            pin_mut!(timeout_fut);
            pin_mut!(fetch);

            match select(fetch, timeout_fut).await {
                Either::Left((response, _)) => response,
                Either::Right((_, pending_fetch)) => {
                    controller.abort();
                    // Poll once more so the abort is observed.
                    let _ = pending_fetch.await;
                    return Err(WasmError::JavaScript(format!(
                        "request timed out after {} ms",
                        timeout.as_millis()
                    )));
                }
            }
        } else {
            fetch.await
        };

        let js_value = result.map_err(|err| WasmError::js("fetch", err))?;
        js_value
            .dyn_into::<Response>()
            .map_err(|_| WasmError::JavaScript("fetch returned non-Response".into()))
    }

    async fn read_body(response: &Response) -> Result<Bytes, WasmError> {
        let promise = response
            .array_buffer()
            .map_err(|err| WasmError::js("response.arrayBuffer", err))?;
        let buffer = JsFuture::from(promise)
            .await
            .map_err(|err| WasmError::js("response body", err))?;
        Ok(Bytes::from(Uint8Array::new(&buffer).to_vec()))
    }

    fn collect_headers(response: &Response) -> Result<HashMap<String, String>, WasmError> {
        let headers = response.headers();
        let iterator = try_iter(&JsValue::from(headers))
            .map_err(|err| WasmError::js("iterate headers", err))?
            .ok_or_else(|| WasmError::JavaScript("Headers iterator unavailable".into()))?;

        let mut map = HashMap::new();
        for entry in iterator {
            let entry = entry.map_err(|err| WasmError::js("header iteration", err))?;
            let pair = Array::from(&entry);
            if let (Some(key), Some(value)) = (pair.get(0).as_string(), pair.get(1).as_string()) {
                map.insert(key, value);
            }
        }

        Ok(map)
    }
}

#[async_trait(?Send)]
impl HttpClient for WasmHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let controller = match request.timeout {
            Some(_) => Some(
                AbortController::new()
                    .map_err(|err| WasmError::js("create abort controller", err))?,
            ),
            None => None,
        };

        let signal = controller.as_ref().map(|c| c.signal());
        let req = self.build_request(&request, signal.as_ref())?;
        let response = self
            .fetch_with_timeout(&req, controller, request.timeout)
            .await?;
        let body = Self::read_body(&response).await?;
        let headers = Self::collect_headers(&response)?;

        let path = request.url.split_once('?').map_or(request.url.as_str(), |(path, _)| path);
        trace!(path, status = response.status(), bytes = body.len(), "fetch completed");
        Ok(HttpResponse {
            status: response.status(),
            headers,
            body,
        })
    }

    async fn is_connected(&self) -> bool {
        self.window.navigator().on_line()
    }
}

fn method_to_str(method: HttpMethod) -> &'static str {
    match method {
        HttpMethod::Get => "GET",
        HttpMethod::Post => "POST",
        HttpMethod::Put => "PUT",
        HttpMethod::Delete => "DELETE",
        HttpMethod::Head => "HEAD",
    }
}
