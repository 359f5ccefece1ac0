//! # Event Bus System
//!
//! Typed engine notifications over `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The playback engine publishes what it does (sessions starting and
//! stopping, segments landing in the buffer, evictions, cache invalidation)
//! so that hosts can drive UI and tests can observe behavior without reaching
//! into engine state.
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐    subscribe    ┌────────────┐
//! │ PlayerEngine ├──────────────>│ EventBus  ├────────────────>│ UI / host  │
//! └──────────────┘               │ (broadcast│                 └────────────┘
//!                                │  channel) │    subscribe    ┌────────────┐
//!                                │           ├────────────────>│ Test suite │
//!                                └───────────┘                 └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new(32);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::RepeatToggled { enabled: true })).ok();
//! assert_eq!(
//!     rx.recv().await.unwrap(),
//!     CoreEvent::Playback(PlaybackEvent::RepeatToggled { enabled: true })
//! );
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events and may keep reading.
//! - **`RecvError::Closed`**: every sender is gone; treat as shutdown.
//!
//! Emitting with no subscribers returns an error. The engine ignores it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall further behind receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Session lifecycle and buffer activity
    Playback(PlaybackEvent),
    /// Segment cache coordination
    Cache(CacheEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::FetchFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Cache(CacheEvent::InvalidationFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::SessionStarted { .. })
            | CoreEvent::Playback(PlaybackEvent::SessionStopped { .. })
            | CoreEvent::Playback(PlaybackEvent::EndOfStream { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Track the event refers to, when there is one.
    pub fn track_id(&self) -> Option<&str> {
        match self {
            CoreEvent::Playback(e) => e.track_id(),
            CoreEvent::Cache(CacheEvent::Invalidated { track_id })
            | CoreEvent::Cache(CacheEvent::InvalidationFailed { track_id, .. }) => Some(track_id),
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// How a session delivers audio to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Segments are fetched and appended to a decode buffer.
    Buffered,
    /// The output element streams the whole track from a URL.
    Direct,
}

/// Events related to playback sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A session was opened for a track.
    SessionStarted {
        session_id: u64,
        track_id: String,
        mode: DeliveryMode,
    },
    /// A fetched segment was accepted by the decode buffer.
    SegmentAppended {
        session_id: u64,
        track_id: String,
        /// First byte of the segment (inclusive).
        start: u64,
        /// Last byte of the segment (inclusive).
        end: u64,
        len: usize,
    },
    /// Already-played media was removed from the decode buffer.
    BufferEvicted {
        session_id: u64,
        track_id: String,
        start_secs: f64,
        end_secs: f64,
    },
    /// A segment request failed; the session stops fetching.
    FetchFailed {
        session_id: u64,
        track_id: String,
        message: String,
    },
    /// The last segment was appended and the buffer was finalized.
    EndOfStream { session_id: u64, track_id: String },
    /// The session was torn down.
    SessionStopped { session_id: u64, track_id: String },
    Paused { track_id: String },
    Resumed { track_id: String },
    RepeatToggled { enabled: bool },
    /// Unrecoverable session error (unsupported format, buffer failure).
    Error {
        track_id: Option<String>,
        message: String,
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::SessionStarted { .. } => "Playback session started",
            PlaybackEvent::SegmentAppended { .. } => "Segment appended",
            PlaybackEvent::BufferEvicted { .. } => "Played media evicted",
            PlaybackEvent::FetchFailed { .. } => "Segment fetch failed",
            PlaybackEvent::EndOfStream { .. } => "End of stream reached",
            PlaybackEvent::SessionStopped { .. } => "Playback session stopped",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::RepeatToggled { .. } => "Repeat mode toggled",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }

    fn track_id(&self) -> Option<&str> {
        match self {
            PlaybackEvent::SessionStarted { track_id, .. }
            | PlaybackEvent::SegmentAppended { track_id, .. }
            | PlaybackEvent::BufferEvicted { track_id, .. }
            | PlaybackEvent::FetchFailed { track_id, .. }
            | PlaybackEvent::EndOfStream { track_id, .. }
            | PlaybackEvent::SessionStopped { track_id, .. }
            | PlaybackEvent::Paused { track_id }
            | PlaybackEvent::Resumed { track_id } => Some(track_id),
            PlaybackEvent::Error { track_id, .. } => track_id.as_deref(),
            PlaybackEvent::RepeatToggled { .. } => None,
        }
    }
}

// ============================================================================
// Cache Events
// ============================================================================

/// Events related to segment cache invalidation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// The cache owner was told to drop a track.
    Invalidated { track_id: String },
    /// The invalidation request failed; playback is unaffected.
    InvalidationFailed { track_id: String, message: String },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::Invalidated { .. } => "Track cache invalidated",
            CacheEvent::InvalidationFailed { .. } => "Track cache invalidation failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender; every `subscribe()` creates an
/// independent receiver that sees events emitted after it was created.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let only_t1 = EventStream::new(bus.subscribe())
///     .filter(|event| event.track_id() == Some("T1"));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |f| f(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive a matching event without waiting.
    ///
    /// Returns `None` if no matching event is currently queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every queued matching event.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.try_recv() {
            match result {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
