//! Platform-specific helper abstractions used to keep trait bounds aligned with
//! the threading guarantees of each target.
//!
//! Native targets require `Send + Sync` so bridge implementations can be shared
//! across async tasks. WebAssembly builds run on the browser's single thread and
//! cannot satisfy those bounds because `web_sys` handles are not thread-safe.
//! The helpers below make the bounds conditional without duplicating every
//! trait definition.

use std::future::Future;
use std::pin::Pin;

/// Marker trait that applies `Send + Sync` on native targets while becoming a
/// no-op on `wasm32`.
#[cfg(not(target_arch = "wasm32"))]
pub trait PlatformSendSync: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<T> PlatformSendSync for T where T: Send + Sync {}

#[cfg(target_arch = "wasm32")]
pub trait PlatformSendSync {}

#[cfg(target_arch = "wasm32")]
impl<T> PlatformSendSync for T {}

/// Owned, boxed future that is `Send` wherever the target allows it.
///
/// The playback engine keeps its in-flight fetches, appends and notifications
/// in a single task set; this alias lets the same code drive `tokio` on native
/// targets and the browser event loop on `wasm32`.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

#[cfg(target_arch = "wasm32")]
pub type PlatformFuture<T> = Pin<Box<dyn Future<Output = T> + 'static>>;
