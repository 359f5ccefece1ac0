//! # Player Engine
//!
//! Single-task driver for the session state machine.
//!
//! ## Overview
//!
//! [`PlayerEngine::run`] owns the [`SessionManager`] and every in-flight
//! operation. It waits on two sources at once: UI commands sent through a
//! [`PlayerHandle`], and completions of the fetch, append, trim, open and
//! play futures it started. Each completion is tagged with the session that
//! asked for it, so work belonging to a superseded session is discarded
//! without touching the current one. Nothing is shared between tasks and no
//! locks are taken.
//!
//! Every live session carries a [`CancellationToken`] that is cancelled at
//! teardown. Queued work checks it before starting, so a stopped session
//! never issues a request or a play after its pause. Work already in flight
//! is not aborted; its completion is discarded by the session id check.
//! Play requests hold a child token that a user pause cancels, so a queued
//! play cannot undo the pause.
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{PlayerEngine, StreamingConfig, TrackRef};
//!
//! let (engine, handle) = PlayerEngine::new(engine_config, StreamingConfig::default())?;
//! tokio::spawn(engine.run());
//!
//! handle.start_track(TrackRef::new("T1", "https://example.com/watch?v=1"))?;
//! handle.toggle_repeat()?;
//! handle.close_track()?;
//! ```

use std::sync::Arc;

use bridge_traits::cache::CacheInvalidator;
use bridge_traits::media::MediaHost;
use bridge_traits::platform::PlatformFuture;
use core_runtime::config::EngineConfig;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus, PlaybackEvent, Receiver};
use futures::channel::mpsc;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::appender::BufferAppender;
use crate::config::StreamingConfig;
use crate::error::{PlaybackError, Result};
use crate::eviction::EvictionPolicy;
use crate::fetcher::SegmentFetcher;
use crate::manager::{SessionManager, Switch, Teardown};
use crate::session::{SessionAction, SessionEvent, SessionId};
use crate::track::TrackRef;

/// Requests accepted by the engine loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    Start(TrackRef),
    Next(TrackRef),
    Prev(TrackRef),
    Pause,
    Resume,
    Close,
    ToggleRepeat,
}

/// Cloneable sender side of the engine.
///
/// Every call returns as soon as the command is queued; the transition
/// itself happens on the engine task.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    commands: mpsc::UnboundedSender<PlayerCommand>,
    events: EventBus,
}

impl PlayerHandle {
    fn send(&self, command: PlayerCommand) -> Result<()> {
        self.commands
            .unbounded_send(command)
            .map_err(|_| PlaybackError::EngineClosed)
    }

    pub fn start_track(&self, track: TrackRef) -> Result<()> {
        self.send(PlayerCommand::Start(track))
    }

    pub fn next_track(&self, track: TrackRef) -> Result<()> {
        self.send(PlayerCommand::Next(track))
    }

    pub fn prev_track(&self, track: TrackRef) -> Result<()> {
        self.send(PlayerCommand::Prev(track))
    }

    pub fn pause_track(&self) -> Result<()> {
        self.send(PlayerCommand::Pause)
    }

    pub fn resume_track(&self) -> Result<()> {
        self.send(PlayerCommand::Resume)
    }

    pub fn close_track(&self) -> Result<()> {
        self.send(PlayerCommand::Close)
    }

    pub fn toggle_repeat(&self) -> Result<()> {
        self.send(PlayerCommand::ToggleRepeat)
    }

    /// Receive engine events emitted from now on.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

type Completion = (SessionId, SessionEvent);

enum Step {
    Command(PlayerCommand),
    Completion(SessionId, SessionEvent),
    /// Work skipped because its session stopped before it started.
    Cancelled,
    Background,
    Shutdown,
}

struct LiveSession {
    id: SessionId,
    /// Cancelled at teardown.
    stop: CancellationToken,
    /// Child of `stop`; replaced on every user pause.
    play: CancellationToken,
}

impl LiveSession {
    fn new(id: SessionId) -> Self {
        let stop = CancellationToken::new();
        let play = stop.child_token();
        Self { id, stop, play }
    }
}

/// Owns the session manager and drives all asynchronous work.
pub struct PlayerEngine {
    manager: SessionManager,
    fetcher: SegmentFetcher,
    host: Arc<dyn MediaHost>,
    invalidator: Arc<dyn CacheInvalidator>,
    events: EventBus,
    eviction: EvictionPolicy,
    commands: mpsc::UnboundedReceiver<PlayerCommand>,
    live: Option<LiveSession>,
    pending: FuturesUnordered<PlatformFuture<Option<Completion>>>,
    /// Fire-and-forget work (cache invalidation).
    background: FuturesUnordered<PlatformFuture<()>>,
}

impl PlayerEngine {
    /// Build an engine from host capabilities.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::InvalidConfig`] when `streaming` fails validation.
    pub fn new(config: EngineConfig, streaming: StreamingConfig) -> Result<(Self, PlayerHandle)> {
        streaming.validate()?;

        let (tx, rx) = mpsc::unbounded();
        let handle = PlayerHandle {
            commands: tx,
            events: config.event_bus.clone(),
        };

        let engine = Self {
            manager: SessionManager::from_config(&streaming),
            fetcher: SegmentFetcher::new(Arc::clone(&config.http_client), &streaming),
            host: config.media_host,
            invalidator: config.cache_invalidator,
            events: config.event_bus,
            eviction: EvictionPolicy::new(streaming.safety_margin_secs),
            commands: rx,
            live: None,
            pending: FuturesUnordered::new(),
            background: FuturesUnordered::new(),
        };

        Ok((engine, handle))
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    /// Process commands and completions until every handle is dropped.
    ///
    /// On shutdown the current session is torn down and outstanding cache
    /// invalidations are awaited.
    pub async fn run(mut self) {
        info!("Playback engine running");

        loop {
            let step = futures::select! {
                command = self.commands.next() => match command {
                    Some(command) => Step::Command(command),
                    None => Step::Shutdown,
                },
                completion = self.pending.select_next_some() => match completion {
                    Some((id, event)) => Step::Completion(id, event),
                    None => Step::Cancelled,
                },
                () = self.background.select_next_some() => Step::Background,
            };

            match step {
                Step::Command(command) => self.apply(command),
                Step::Completion(id, event) => {
                    let actions = self.manager.dispatch(id, event);
                    self.execute(id, actions);
                }
                Step::Cancelled | Step::Background => {}
                Step::Shutdown => break,
            }
        }

        if let Some(teardown) = self.manager.close() {
            self.finish_teardown(teardown);
        }
        while self.background.next().await.is_some() {}

        info!("Playback engine stopped");
    }

    fn apply(&mut self, command: PlayerCommand) {
        debug!(?command, "Command received");
        let buffering = self.host.supports_buffering();

        match command {
            PlayerCommand::Start(track) => {
                let switch = self.manager.start(track, buffering);
                self.switch(switch);
            }
            PlayerCommand::Next(track) => {
                let switch = self.manager.next(track, buffering);
                self.switch(switch);
            }
            PlayerCommand::Prev(track) => {
                let switch = self.manager.prev(track, buffering);
                self.switch(switch);
            }
            PlayerCommand::Close => {
                if let Some(teardown) = self.manager.close() {
                    self.finish_teardown(teardown);
                }
            }
            PlayerCommand::Pause => self.pause(),
            PlayerCommand::Resume => self.resume(),
            PlayerCommand::ToggleRepeat => {
                let enabled = self.manager.toggle_repeat();
                self.emit(PlaybackEvent::RepeatToggled { enabled });
            }
        }
    }

    fn switch(&mut self, switch: Switch) {
        if let Some(teardown) = switch.teardown {
            self.finish_teardown(teardown);
        }
        self.live = Some(LiveSession::new(switch.session_id));
        self.execute(switch.session_id, switch.actions);
    }

    fn pause(&mut self) {
        let Some(track_id) = self.manager.pause() else {
            debug!("Pause ignored, nothing playing");
            return;
        };
        if let Some(live) = self.live.as_mut() {
            live.play.cancel();
            live.play = live.stop.child_token();
        }
        if let Err(e) = self.host.pause() {
            warn!(error = %e, "Pause failed");
            return;
        }
        self.emit(PlaybackEvent::Paused { track_id });
    }

    fn resume(&mut self) {
        let Some((id, track_id, actions)) = self.manager.resume() else {
            debug!("Resume ignored, nothing to play");
            return;
        };
        self.execute(id, actions);
        self.emit(PlaybackEvent::Resumed { track_id });
    }

    fn live(&self, id: SessionId) -> Option<&LiveSession> {
        self.live.as_ref().filter(|live| live.id == id)
    }

    /// Queue `work` for session `id`, unless that session already stopped.
    fn push_work(&mut self, id: SessionId, work: PlatformFuture<SessionEvent>) {
        let Some(token) = self.live(id).map(|live| live.stop.clone()) else {
            trace!(session = id, "Dropping work for stopped session");
            return;
        };
        self.push_guarded(id, token, work);
    }

    /// `work` starts on first poll only if `token` is still uncancelled.
    fn push_guarded(&mut self, id: SessionId, token: CancellationToken, work: PlatformFuture<SessionEvent>) {
        self.pending.push(Box::pin(async move {
            if token.is_cancelled() {
                return None;
            }
            Some((id, work.await))
        }));
    }

    fn appender_for(&self, id: SessionId) -> Option<BufferAppender> {
        self.manager.session(id).and_then(|s| s.appender()).cloned()
    }

    fn execute(&mut self, id: SessionId, actions: Vec<SessionAction>) {
        for action in actions {
            match action {
                SessionAction::OpenBuffer { mime_type } => {
                    let host = Arc::clone(&self.host);
                    let eviction = self.eviction;
                    // A buffer opened for a stopped session is released on dispatch.
                    self.push_work(
                        id,
                        Box::pin(async move {
                            SessionEvent::Opened(BufferAppender::open(host, &mime_type, eviction).await)
                        }),
                    );
                }
                SessionAction::StreamDirect => {
                    let Some(session) = self.manager.session(id) else {
                        continue;
                    };
                    let url = self.fetcher.stream_url(session.track());
                    if let Err(e) = self.host.set_source_url(&url) {
                        warn!(session = id, error = %e, "Failed to set direct stream source");
                    }
                }
                SessionAction::Fetch(range) => {
                    let Some(session) = self.manager.session(id) else {
                        continue;
                    };
                    let track = session.track().clone();
                    let fetcher = self.fetcher.clone();
                    self.push_work(
                        id,
                        Box::pin(async move {
                            SessionEvent::FetchCompleted(fetcher.fetch(&track, range).await)
                        }),
                    );
                }
                SessionAction::Append(data) => {
                    let Some(appender) = self.appender_for(id) else {
                        continue;
                    };
                    self.push_work(
                        id,
                        Box::pin(async move { SessionEvent::AppendCompleted(appender.append(data).await) }),
                    );
                }
                SessionAction::Trim { keep_window_secs } => {
                    let Some(appender) = self.appender_for(id) else {
                        continue;
                    };
                    self.push_work(
                        id,
                        Box::pin(async move { SessionEvent::TrimCompleted(appender.trim(keep_window_secs).await) }),
                    );
                }
                SessionAction::EndStream => {
                    if let Some(appender) = self.appender_for(id) {
                        if let Err(e) = appender.end_of_stream() {
                            warn!(session = id, error = %e, "Failed to end decode stream");
                        }
                    }
                }
                SessionAction::Play => self.play(id),
                SessionAction::Notify(event) => self.emit(event),
            }
        }
    }

    fn play(&mut self, id: SessionId) {
        let Some(token) = self.live(id).map(|live| live.play.clone()) else {
            trace!(session = id, "Dropping play for stopped session");
            return;
        };
        let host = Arc::clone(&self.host);
        self.push_guarded(
            id,
            token,
            Box::pin(async move { SessionEvent::PlayStarted(host.play().await) }),
        );
    }

    /// Release what a stopped session held and notify the cache owner.
    fn finish_teardown(&mut self, teardown: Teardown) {
        let Teardown {
            session,
            appender,
            invalidate,
        } = teardown;

        if self.live(session.id()).is_some() {
            if let Some(live) = self.live.take() {
                live.stop.cancel();
            }
        }
        if let Err(e) = self.host.pause() {
            debug!(error = %e, "Pause during teardown failed");
        }
        if let Some(appender) = appender {
            appender.close();
        }

        let track_id = session.track().id.clone();
        self.emit(PlaybackEvent::SessionStopped {
            session_id: session.id(),
            track_id: track_id.clone(),
        });

        if !invalidate {
            debug!(track_id = %track_id, "Repeat on, keeping cached segments");
            return;
        }

        let invalidator = Arc::clone(&self.invalidator);
        let events = self.events.clone();
        self.background.push(Box::pin(async move {
            let event = match invalidator.invalidate(&track_id).await {
                Ok(()) => CacheEvent::Invalidated { track_id },
                Err(e) => {
                    warn!(track_id = %track_id, error = %e, "Cache invalidation failed");
                    CacheEvent::InvalidationFailed {
                        track_id,
                        message: e.to_string(),
                    }
                }
            };
            events.emit(CoreEvent::Cache(event)).ok();
        }));
    }

    fn emit(&self, event: PlaybackEvent) {
        self.events.emit(CoreEvent::Playback(event)).ok();
    }
}

impl std::fmt::Debug for PlayerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerEngine")
            .field("manager", &self.manager)
            .field("live", &self.live.as_ref().map(|live| live.id))
            .field("fetcher", &self.fetcher)
            .field("pending", &self.pending.len())
            .field("background", &self.background.len())
            .finish()
    }
}
