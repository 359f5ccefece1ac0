//! Ownership of the single live playback session.

use tracing::{debug, info, trace};

use crate::appender::BufferAppender;
use crate::config::StreamingConfig;
use crate::session::{PlaybackSession, SessionAction, SessionEvent, SessionId, SessionParams};
use crate::track::TrackRef;

/// A session that was just stopped, with the cleanup it still needs.
#[derive(Debug)]
pub struct Teardown {
    /// The stopped session (state `Stopped`).
    pub session: PlaybackSession,
    /// Decode buffer to detach and release, if one was opened.
    pub appender: Option<BufferAppender>,
    /// Whether the track's cached segments should be invalidated.
    pub invalidate: bool,
}

/// Result of starting a track.
#[derive(Debug)]
pub struct Switch {
    /// The previous session, already stopped.
    pub teardown: Option<Teardown>,
    pub session_id: SessionId,
    pub actions: Vec<SessionAction>,
}

/// Holds at most one [`PlaybackSession`] and the repeat flag.
///
/// The previous session is always stopped before its successor is created.
#[derive(Debug)]
pub struct SessionManager {
    current: Option<PlaybackSession>,
    repeat: bool,
    last_id: SessionId,
    params: SessionParams,
}

impl SessionManager {
    pub fn new(params: SessionParams) -> Self {
        Self {
            current: None,
            repeat: false,
            last_id: 0,
            params,
        }
    }

    pub fn from_config(config: &StreamingConfig) -> Self {
        Self::new(SessionParams {
            segment_bytes: config.segment_bytes,
            keep_window_secs: config.keep_window_secs,
            mime_type: config.mime_type.clone(),
        })
    }

    pub fn current(&self) -> Option<&PlaybackSession> {
        self.current.as_ref()
    }

    /// The current session, if it is `id`.
    pub fn session(&self, id: SessionId) -> Option<&PlaybackSession> {
        self.current.as_ref().filter(|session| session.id() == id)
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    /// Tear down the current session, then start one for `track`.
    pub fn start(&mut self, track: TrackRef, supports_buffering: bool) -> Switch {
        let teardown = self.teardown();

        self.last_id += 1;
        let session_id = self.last_id;
        let mut session = PlaybackSession::new(session_id, track, self.params.clone());
        let actions = session.start(supports_buffering);

        info!(session = session_id, track_id = %session.track().id, "Session started");
        self.current = Some(session);

        Switch {
            teardown,
            session_id,
            actions,
        }
    }

    /// Queue order is the caller's concern; `next` starts `track`.
    pub fn next(&mut self, track: TrackRef, supports_buffering: bool) -> Switch {
        self.start(track, supports_buffering)
    }

    pub fn prev(&mut self, track: TrackRef, supports_buffering: bool) -> Switch {
        self.start(track, supports_buffering)
    }

    /// Tear down the current session without starting another.
    ///
    /// `None` when nothing was playing.
    pub fn close(&mut self) -> Option<Teardown> {
        self.teardown()
    }

    /// Flip the repeat flag; applies to the next teardown.
    pub fn toggle_repeat(&mut self) -> bool {
        self.repeat = !self.repeat;
        debug!(repeat = self.repeat, "Repeat toggled");
        self.repeat
    }

    /// Record a user pause on the live session and return its track id.
    pub fn pause(&mut self) -> Option<String> {
        let session = self.current.as_mut()?;
        session.pause().then(|| session.track().id.clone())
    }

    /// Clear a user pause on the live session.
    ///
    /// Returns the session id, its track id and the actions to run, or `None`
    /// when the session has nothing it could play.
    pub fn resume(&mut self) -> Option<(SessionId, String, Vec<SessionAction>)> {
        let session = self.current.as_mut()?;
        let actions = session.resume()?;
        Some((session.id(), session.track().id.clone(), actions))
    }

    /// Route a completion to the session that requested it.
    ///
    /// Completions for superseded sessions are dropped; a decode buffer that
    /// finished opening too late is released.
    pub fn dispatch(&mut self, id: SessionId, event: SessionEvent) -> Vec<SessionAction> {
        match self.current.as_mut() {
            Some(session) if session.id() == id => session.handle(event),
            _ => {
                trace!(session = id, ?event, "Discarding completion for superseded session");
                if let SessionEvent::Opened(Ok(appender)) = event {
                    appender.close();
                }
                Vec::new()
            }
        }
    }

    fn teardown(&mut self) -> Option<Teardown> {
        let mut session = self.current.take()?;
        let appender = session.stop();
        let stats = session.stats();

        info!(
            session = session.id(),
            track_id = %session.track().id,
            segments = stats.segments_appended,
            bytes = stats.bytes_appended,
            evictions = stats.evictions,
            fetch_failures = stats.fetch_failures,
            "Session stopped"
        );

        Some(Teardown {
            session,
            appender,
            invalidate: !self.repeat,
        })
    }
}
