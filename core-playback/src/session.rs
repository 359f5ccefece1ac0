//! # Playback Session
//!
//! One track's lifecycle as an explicit state machine.
//!
//! ## Overview
//!
//! A session performs no I/O. The engine feeds it [`SessionEvent`]s (open,
//! fetch, append, trim and play completions) and executes the
//! [`SessionAction`]s it returns. Forward progress is a strict loop:
//!
//! ```text
//! Opening ──open ok──> Filling ──fetch ok──> Appending ──append ok──> (trim) ──> Filling ...
//!    │                    │                                   │
//!    └─open err─> Failed  └─fetch err: stall                  └─last segment─> Ended
//! ```
//!
//! `stop()` moves any state to `Stopped`; from then on every completion is
//! ignored. At most one fetch, append or trim is outstanding at a time.

use bytes::Bytes;
use core_runtime::events::{DeliveryMode, PlaybackEvent};
use tracing::{debug, info, trace, warn};

use bridge_traits::error::BridgeError;
use bridge_traits::media::TimeRange;

use crate::appender::BufferAppender;
use crate::error::Result;
use crate::track::{ByteRange, Segment, TrackRef};

/// Monotonic identifier tagging every operation a session starts.
pub type SessionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// Waiting for the decode buffer.
    Opening,
    /// A fetch is in flight, or the loop stalled after a failed fetch.
    Filling,
    /// An append is in flight.
    Appending,
    /// Every segment is buffered; waiting for teardown.
    Ended,
    /// The output streams the track from a URL; no fetch loop.
    Direct,
    /// The buffer could not be opened or rejected data.
    Failed,
    Stopped,
}

impl SessionState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, SessionState::Stopped)
    }
}

/// Completion of work a session asked for.
#[derive(Debug)]
pub enum SessionEvent {
    Opened(Result<BufferAppender>),
    FetchCompleted(Result<Segment>),
    AppendCompleted(Result<()>),
    /// Trim finished; carries the removed range, if any.
    TrimCompleted(Option<TimeRange>),
    /// The output's answer to a play request; hosts may refuse autoplay.
    PlayStarted(std::result::Result<(), BridgeError>),
}

/// Work the engine must perform on behalf of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    OpenBuffer { mime_type: String },
    /// Point the output at the stream URL instead of buffering.
    StreamDirect,
    Fetch(ByteRange),
    Append(Bytes),
    Trim { keep_window_secs: f64 },
    EndStream,
    Play,
    Notify(PlaybackEvent),
}

/// Counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub segments_fetched: u64,
    pub segments_appended: u64,
    pub bytes_appended: u64,
    pub evictions: u64,
    pub fetch_failures: u64,
}

/// Per-session settings copied from the streaming configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionParams {
    pub segment_bytes: u64,
    pub keep_window_secs: f64,
    pub mime_type: String,
}

pub struct PlaybackSession {
    id: SessionId,
    track: TrackRef,
    params: SessionParams,
    state: SessionState,
    next_segment_start: u64,
    stopped: bool,
    /// Set by a user pause; suppresses the automatic play once the buffer opens.
    paused: bool,
    fetching: bool,
    is_appending: bool,
    trimming: bool,
    /// Range of the segment handed to the buffer, until its append completes.
    in_buffer: Option<ByteRange>,
    last_segment: bool,
    total_length: Option<u64>,
    appender: Option<BufferAppender>,
    stats: SessionStats,
}

impl PlaybackSession {
    pub fn new(id: SessionId, track: TrackRef, params: SessionParams) -> Self {
        Self {
            id,
            track,
            params,
            state: SessionState::Idle,
            next_segment_start: 0,
            stopped: false,
            paused: false,
            fetching: false,
            is_appending: false,
            trimming: false,
            in_buffer: None,
            last_segment: false,
            total_length: None,
            appender: None,
            stats: SessionStats::default(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn track(&self) -> &TrackRef {
        &self.track
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn next_segment_start(&self) -> u64 {
        self.next_segment_start
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    pub fn is_appending(&self) -> bool {
        self.is_appending
    }

    /// Track length learned from `Content-Range`, if any.
    pub fn total_length(&self) -> Option<u64> {
        self.total_length
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn appender(&self) -> Option<&BufferAppender> {
        self.appender.as_ref()
    }

    /// Leave `Idle`. Without buffering support the output streams directly.
    pub fn start(&mut self, supports_buffering: bool) -> Vec<SessionAction> {
        if self.state != SessionState::Idle || self.stopped {
            return Vec::new();
        }

        if !supports_buffering {
            info!(session = self.id, track_id = %self.track.id, "Buffering unavailable, streaming directly");
            self.state = SessionState::Direct;
            return vec![
                self.started_notice(DeliveryMode::Direct),
                SessionAction::StreamDirect,
                SessionAction::Play,
            ];
        }

        self.state = SessionState::Opening;
        vec![
            self.started_notice(DeliveryMode::Buffered),
            SessionAction::OpenBuffer {
                mime_type: self.params.mime_type.clone(),
            },
        ]
    }

    /// Advance on a completion. Completions after `stop()` are ignored.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        if self.stopped {
            trace!(session = self.id, ?event, "Ignoring completion for stopped session");
            if let SessionEvent::Opened(Ok(appender)) = event {
                appender.close();
            }
            return Vec::new();
        }

        match event {
            SessionEvent::Opened(result) => self.on_opened(result),
            SessionEvent::FetchCompleted(result) => self.on_fetch_completed(result),
            SessionEvent::AppendCompleted(result) => self.on_append_completed(result),
            SessionEvent::TrimCompleted(removed) => self.on_trim_completed(removed),
            SessionEvent::PlayStarted(result) => {
                if let Err(e) = result {
                    warn!(session = self.id, error = %e, "Playback start rejected");
                }
                Vec::new()
            }
        }
    }

    /// Record a user pause. Returns `false` once stopped.
    pub fn pause(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        self.paused = true;
        true
    }

    /// Clear a user pause.
    ///
    /// `None` when there is nothing that could play: the session is stopped,
    /// failed or never started. While the buffer is still opening the pause is
    /// cleared and playback begins once it opens.
    pub fn resume(&mut self) -> Option<Vec<SessionAction>> {
        if self.stopped {
            return None;
        }
        match self.state {
            SessionState::Opening => {
                self.paused = false;
                Some(Vec::new())
            }
            SessionState::Filling
            | SessionState::Appending
            | SessionState::Ended
            | SessionState::Direct => {
                self.paused = false;
                Some(vec![SessionAction::Play])
            }
            SessionState::Idle | SessionState::Failed | SessionState::Stopped => None,
        }
    }

    /// Mark the session stopped and hand back its decode buffer for release.
    ///
    /// Idempotent; later calls return `None`.
    pub fn stop(&mut self) -> Option<BufferAppender> {
        if self.stopped {
            return None;
        }
        self.stopped = true;
        self.fetching = false;
        self.is_appending = false;
        self.trimming = false;
        self.in_buffer = None;
        self.state = SessionState::Stopped;
        self.appender.take()
    }

    fn on_opened(&mut self, result: Result<BufferAppender>) -> Vec<SessionAction> {
        if self.state != SessionState::Opening {
            if let Ok(appender) = result {
                appender.close();
            }
            return Vec::new();
        }

        match result {
            Ok(appender) => {
                self.appender = Some(appender);
                self.state = SessionState::Filling;
                let mut actions = Vec::new();
                if self.paused {
                    debug!(session = self.id, "Buffer opened while paused, holding playback");
                } else {
                    actions.push(SessionAction::Play);
                }
                actions.extend(self.fetch_next());
                actions
            }
            Err(e) => {
                warn!(session = self.id, track_id = %self.track.id, error = %e, "Cannot open decode buffer");
                self.state = SessionState::Failed;
                vec![self.error_notice(e.to_string())]
            }
        }
    }

    fn on_fetch_completed(&mut self, result: Result<Segment>) -> Vec<SessionAction> {
        if !self.fetching {
            warn!(session = self.id, "Unexpected fetch completion");
            return Vec::new();
        }
        self.fetching = false;

        let segment = match result {
            Ok(segment) => segment,
            Err(e) => {
                self.stats.fetch_failures += 1;
                warn!(
                    session = self.id,
                    offset = self.next_segment_start,
                    transient = e.is_transient(),
                    error = %e,
                    "Segment fetch failed, loop halted"
                );
                return vec![SessionAction::Notify(PlaybackEvent::FetchFailed {
                    session_id: self.id,
                    track_id: self.track.id.clone(),
                    message: e.to_string(),
                })];
            }
        };

        self.stats.segments_fetched += 1;
        if segment.total_length.is_some() {
            self.total_length = segment.total_length;
        }

        if segment.is_empty() {
            debug!(session = self.id, "Empty segment, stream complete");
            return self.finish_stream();
        }

        self.next_segment_start = segment.next_offset();
        self.last_segment = segment.is_last();
        self.in_buffer = Some(ByteRange::new(segment.requested.start, self.next_segment_start - 1));
        self.is_appending = true;
        self.state = SessionState::Appending;

        trace!(
            session = self.id,
            bytes = segment.len(),
            next = self.next_segment_start,
            last = self.last_segment,
            "Appending segment"
        );
        vec![SessionAction::Append(segment.data)]
    }

    fn on_append_completed(&mut self, result: Result<()>) -> Vec<SessionAction> {
        if !self.is_appending {
            warn!(session = self.id, "Unexpected append completion");
            return Vec::new();
        }
        self.is_appending = false;
        let appended = self.in_buffer.take();

        if let Err(e) = result {
            warn!(session = self.id, error = %e, "Decode buffer rejected segment");
            self.state = SessionState::Failed;
            return vec![self.error_notice(e.to_string())];
        }

        let mut actions = Vec::new();
        if let Some(range) = appended {
            self.stats.segments_appended += 1;
            self.stats.bytes_appended += range.byte_count();
            actions.push(SessionAction::Notify(PlaybackEvent::SegmentAppended {
                session_id: self.id,
                track_id: self.track.id.clone(),
                start: range.start,
                end: range.end,
                len: range.byte_count() as usize,
            }));
        }

        if self.last_segment {
            actions.extend(self.finish_stream());
            return actions;
        }

        self.state = SessionState::Filling;
        self.trimming = true;
        actions.push(SessionAction::Trim {
            keep_window_secs: self.params.keep_window_secs,
        });
        actions
    }

    fn on_trim_completed(&mut self, removed: Option<TimeRange>) -> Vec<SessionAction> {
        if !self.trimming {
            return Vec::new();
        }
        self.trimming = false;

        let mut actions = Vec::new();
        if let Some(range) = removed {
            self.stats.evictions += 1;
            actions.push(SessionAction::Notify(PlaybackEvent::BufferEvicted {
                session_id: self.id,
                track_id: self.track.id.clone(),
                start_secs: range.start,
                end_secs: range.end,
            }));
        }

        if self.state == SessionState::Filling {
            actions.extend(self.fetch_next());
        }
        actions
    }

    fn fetch_next(&mut self) -> Option<SessionAction> {
        if self.stopped || self.fetching || self.is_appending || self.trimming {
            return None;
        }
        self.fetching = true;
        Some(SessionAction::Fetch(ByteRange::window(
            self.next_segment_start,
            self.params.segment_bytes,
        )))
    }

    fn finish_stream(&mut self) -> Vec<SessionAction> {
        info!(
            session = self.id,
            track_id = %self.track.id,
            bytes = self.stats.bytes_appended,
            "Track fully buffered"
        );
        self.state = SessionState::Ended;
        vec![
            SessionAction::EndStream,
            SessionAction::Notify(PlaybackEvent::EndOfStream {
                session_id: self.id,
                track_id: self.track.id.clone(),
            }),
        ]
    }

    fn started_notice(&self, mode: DeliveryMode) -> SessionAction {
        SessionAction::Notify(PlaybackEvent::SessionStarted {
            session_id: self.id,
            track_id: self.track.id.clone(),
            mode,
        })
    }

    fn error_notice(&self, message: String) -> SessionAction {
        SessionAction::Notify(PlaybackEvent::Error {
            track_id: Some(self.track.id.clone()),
            message,
            recoverable: false,
        })
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("id", &self.id)
            .field("track", &self.track)
            .field("state", &self.state)
            .field("next_segment_start", &self.next_segment_start)
            .field("stopped", &self.stopped)
            .field("paused", &self.paused)
            .field("fetching", &self.fetching)
            .field("is_appending", &self.is_appending)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlaybackError;
    use crate::eviction::EvictionPolicy;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::media::{MediaBuffer, MediaHost, SharedMediaBuffer};
    use std::sync::Arc;

    struct NullBuffer;

    #[async_trait]
    impl MediaBuffer for NullBuffer {
        fn is_updating(&self) -> bool {
            false
        }
        fn buffered(&self) -> Option<TimeRange> {
            None
        }
        async fn append(&self, _data: Bytes) -> BridgeResult<()> {
            Ok(())
        }
        async fn remove(&self, _start: f64, _end: f64) -> BridgeResult<()> {
            Ok(())
        }
        fn end_of_stream(&self) -> BridgeResult<()> {
            Ok(())
        }
        fn detach(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct NullHost;

    #[async_trait]
    impl MediaHost for NullHost {
        fn supports_buffering(&self) -> bool {
            true
        }
        fn is_type_supported(&self, _mime_type: &str) -> bool {
            true
        }
        async fn open_buffer(&self, _mime_type: &str) -> BridgeResult<SharedMediaBuffer> {
            Ok(Arc::new(NullBuffer))
        }
        fn set_source_url(&self, _url: &str) -> BridgeResult<()> {
            Ok(())
        }
        fn current_time(&self) -> f64 {
            0.0
        }
        async fn play(&self) -> BridgeResult<()> {
            Ok(())
        }
        fn pause(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn params(segment_bytes: u64) -> SessionParams {
        SessionParams {
            segment_bytes,
            keep_window_secs: 30.0,
            mime_type: "audio/webm; codecs=\"opus\"".to_string(),
        }
    }

    fn appender() -> BufferAppender {
        BufferAppender::new(Arc::new(NullHost), Arc::new(NullBuffer), EvictionPolicy::default())
    }

    fn segment(range: ByteRange, len: usize) -> Segment {
        Segment {
            requested: range,
            data: Bytes::from(vec![7u8; len]),
            status: 206,
            total_length: None,
        }
    }

    fn fetches(actions: &[SessionAction]) -> Vec<ByteRange> {
        actions
            .iter()
            .filter_map(|a| match a {
                SessionAction::Fetch(range) => Some(*range),
                _ => None,
            })
            .collect()
    }

    fn opened_session(segment_bytes: u64) -> (PlaybackSession, Vec<SessionAction>) {
        let mut session = PlaybackSession::new(1, TrackRef::new("T1", "S1"), params(segment_bytes));
        session.start(true);
        let actions = session.handle(SessionEvent::Opened(Ok(appender())));
        (session, actions)
    }

    #[test]
    fn test_start_opens_buffer_with_fixed_mime() {
        let mut session = PlaybackSession::new(1, TrackRef::new("T1", "S1"), params(262_144));
        let actions = session.start(true);

        assert_eq!(session.state(), SessionState::Opening);
        assert!(actions.contains(&SessionAction::OpenBuffer {
            mime_type: "audio/webm; codecs=\"opus\"".to_string()
        }));
        assert!(session.start(true).is_empty());
    }

    #[test]
    fn test_first_fetch_and_append() {
        let (mut session, actions) = opened_session(262_144);
        assert_eq!(session.state(), SessionState::Filling);
        assert!(actions.contains(&SessionAction::Play));

        let first = fetches(&actions);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].to_header_value(), "bytes=0-262143");

        let actions = session.handle(SessionEvent::FetchCompleted(Ok(segment(first[0], 262_144))));
        assert_eq!(session.next_segment_start(), 262_144);
        assert_eq!(session.state(), SessionState::Appending);
        match actions.as_slice() {
            [SessionAction::Append(data)] => assert_eq!(data.len(), 262_144),
            other => panic!("expected a single append, got {:?}", other),
        }
    }

    #[test]
    fn test_loop_alternates_fetch_append_trim() {
        let (mut session, actions) = opened_session(10);
        let range = fetches(&actions)[0];

        session.handle(SessionEvent::FetchCompleted(Ok(segment(range, 10))));
        let after_append = session.handle(SessionEvent::AppendCompleted(Ok(())));
        assert!(after_append.contains(&SessionAction::Trim { keep_window_secs: 30.0 }));
        assert!(fetches(&after_append).is_empty());

        let after_trim = session.handle(SessionEvent::TrimCompleted(None));
        assert_eq!(fetches(&after_trim), vec![ByteRange::new(10, 19)]);
        assert_eq!(session.stats().segments_appended, 1);
        assert_eq!(session.stats().bytes_appended, 10);
    }

    #[test]
    fn test_duplicate_completions_are_ignored() {
        let (mut session, actions) = opened_session(10);
        let range = fetches(&actions)[0];

        session.handle(SessionEvent::FetchCompleted(Ok(segment(range, 10))));
        // A second fetch completion while appending must not start another append
        assert!(session
            .handle(SessionEvent::FetchCompleted(Ok(segment(range, 10))))
            .is_empty());

        session.handle(SessionEvent::AppendCompleted(Ok(())));
        assert!(session.handle(SessionEvent::AppendCompleted(Ok(()))).is_empty());
    }

    #[test]
    fn test_fetch_failure_stalls_without_advancing() {
        let (mut session, actions) = opened_session(10);
        let range = fetches(&actions)[0];

        let actions = session.handle(SessionEvent::FetchCompleted(Err(PlaybackError::HttpStatus {
            status: 500,
            url: "/api/stream".to_string(),
        })));

        assert_eq!(session.next_segment_start(), 0);
        assert!(!session.is_fetching());
        assert_eq!(session.state(), SessionState::Filling);
        assert!(fetches(&actions).is_empty());
        assert!(matches!(
            actions.as_slice(),
            [SessionAction::Notify(PlaybackEvent::FetchFailed { .. })]
        ));
        assert_eq!(range.start, 0);
        assert_eq!(session.stats().fetch_failures, 1);
    }

    #[test]
    fn test_short_segment_ends_stream() {
        let (mut session, actions) = opened_session(10);
        let range = fetches(&actions)[0];

        session.handle(SessionEvent::FetchCompleted(Ok(segment(range, 4))));
        let actions = session.handle(SessionEvent::AppendCompleted(Ok(())));

        assert_eq!(session.state(), SessionState::Ended);
        assert!(actions.contains(&SessionAction::EndStream));
        assert!(fetches(&actions).is_empty());
    }

    #[test]
    fn test_unsupported_codec_fails_session() {
        let mut session = PlaybackSession::new(1, TrackRef::new("T1", "S1"), params(10));
        session.start(true);
        let actions = session.handle(SessionEvent::Opened(Err(PlaybackError::UnsupportedCodec(
            "audio/webm".to_string(),
        ))));

        assert_eq!(session.state(), SessionState::Failed);
        assert!(fetches(&actions).is_empty());
        assert!(!actions.contains(&SessionAction::Play));
    }

    #[test]
    fn test_direct_fallback_skips_loop() {
        let mut session = PlaybackSession::new(1, TrackRef::new("T1", "S1"), params(10));
        let actions = session.start(false);

        assert_eq!(session.state(), SessionState::Direct);
        assert!(actions.contains(&SessionAction::StreamDirect));
        assert!(actions.contains(&SessionAction::Play));
        assert!(fetches(&actions).is_empty());
    }

    #[test]
    fn test_stopped_session_ignores_late_completions() {
        let (mut session, actions) = opened_session(10);
        let range = fetches(&actions)[0];

        assert!(session.stop().is_some());
        assert!(session.stop().is_none());
        assert_eq!(session.state(), SessionState::Stopped);

        assert!(session
            .handle(SessionEvent::FetchCompleted(Ok(segment(range, 10))))
            .is_empty());
        assert!(session.handle(SessionEvent::AppendCompleted(Ok(()))).is_empty());
        assert!(session.handle(SessionEvent::TrimCompleted(None)).is_empty());
        assert_eq!(session.next_segment_start(), 0);
    }

    #[test]
    fn test_pause_while_opening_holds_playback() {
        let mut session = PlaybackSession::new(1, TrackRef::new("T1", "S1"), params(10));
        session.start(true);
        assert!(session.pause());

        let actions = session.handle(SessionEvent::Opened(Ok(appender())));
        assert!(!actions.contains(&SessionAction::Play));
        assert_eq!(fetches(&actions).len(), 1);
        assert!(session.is_paused());

        assert_eq!(session.resume(), Some(vec![SessionAction::Play]));
        assert!(!session.is_paused());
    }

    #[test]
    fn test_resume_while_opening_defers_play_to_open() {
        let mut session = PlaybackSession::new(1, TrackRef::new("T1", "S1"), params(10));
        session.start(true);
        session.pause();

        assert_eq!(session.resume(), Some(Vec::new()));
        let actions = session.handle(SessionEvent::Opened(Ok(appender())));
        assert!(actions.contains(&SessionAction::Play));
    }

    #[test]
    fn test_resume_ignored_without_playable_media() {
        let mut failed = PlaybackSession::new(1, TrackRef::new("T1", "S1"), params(10));
        failed.start(true);
        failed.handle(SessionEvent::Opened(Err(PlaybackError::UnsupportedCodec(
            "audio/webm".to_string(),
        ))));
        assert_eq!(failed.resume(), None);

        let (mut stopped, _) = opened_session(10);
        stopped.stop();
        assert!(!stopped.pause());
        assert_eq!(stopped.resume(), None);
    }
}
