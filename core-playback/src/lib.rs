//! # Segmented Playback
//!
//! Streams a remote audio track in fixed-size byte ranges and feeds it to a
//! host decode buffer, keeping only a bounded window of played media.
//!
//! ## Overview
//!
//! - [`SegmentFetcher`] requests byte ranges from the streaming endpoint.
//! - [`BufferAppender`] owns one decode buffer and serializes appends.
//! - [`EvictionPolicy`] decides which played media can be dropped.
//! - [`PlaybackSession`] is the per-track state machine. It performs no I/O;
//!   it answers [`SessionEvent`]s with [`SessionAction`]s.
//! - [`SessionManager`] keeps at most one live session and the repeat flag.
//! - [`PlayerEngine`] executes actions, routes completions back and tears
//!   sessions down, notifying the cache owner through a
//!   [`CacheInvalidator`](bridge_traits::cache::CacheInvalidator).
//!
//! Hosts without a buffering API fall back to pointing the output at the
//! stream URL directly.

pub mod appender;
pub mod config;
pub mod engine;
pub mod error;
pub mod eviction;
pub mod fetcher;
pub mod invalidation;
pub mod manager;
pub mod session;
pub mod track;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use appender::BufferAppender;
pub use config::StreamingConfig;
pub use engine::{PlayerCommand, PlayerEngine, PlayerHandle};
pub use error::{PlaybackError, Result};
pub use eviction::EvictionPolicy;
pub use fetcher::SegmentFetcher;
pub use invalidation::HttpCacheInvalidator;
pub use manager::{SessionManager, Switch, Teardown};
pub use session::{
    PlaybackSession, SessionAction, SessionEvent, SessionId, SessionParams, SessionState,
    SessionStats,
};
pub use track::{ByteRange, Segment, TrackRef};
