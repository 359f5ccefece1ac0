//! Workspace facade crate.
//!
//! Re-exports the playback engine with the runtime and bridge crates it is
//! configured with, so host applications can depend on
//! `rangeplay-workspace` alone and pick a platform through its features
//! (`desktop-shims` by default, `wasm` for browser builds).

pub use bridge_traits as bridge;
pub use core_playback as playback;
pub use core_runtime as runtime;

pub use core_playback::{PlaybackError, PlayerEngine, PlayerHandle, StreamingConfig, TrackRef};
pub use core_runtime::config::EngineConfig;
pub use core_runtime::events::{CoreEvent, EventBus};
