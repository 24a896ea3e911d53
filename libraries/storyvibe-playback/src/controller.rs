//! Playback controller - binds a session to a media engine
//!
//! The controller owns at most one [`PlaybackSession`] at a time together with
//! the engine handle it drives and the background tasks that keep both in
//! sync:
//!
//! - the **listener**, translating [`MediaEvent`]s into session transitions
//! - the **sampler**, republishing the engine position while playing
//! - the **fade timer**, stepping the volume ramp after a fading autoplay
//! - the **autoplay timer**, starting playback after the configured delay
//!
//! Every task holds a child of the session's cancellation token and checks the
//! session id under the state lock before touching anything, so a callback
//! that fires after `dispose` (or after another `load`) is dropped.
//!
//! All methods except [`PlaybackController::play`] are synchronous. `load`
//! spawns tasks and must be called from within a Tokio runtime.

use crate::{
    engine::{MediaBackend, MediaEvent, MediaEvents, MediaHandle},
    error::{PlaybackError, Result},
    events::{EventQueue, PlaybackEvent},
    session::{EndOutcome, PlaybackSession},
    types::{PlaybackConfig, PlaybackSnapshot, PlaybackState, SessionOptions},
};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A background task bound to one session
#[derive(Debug)]
struct TaskSlot {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl TaskSlot {
    fn spawn<F, Fut>(parent: &CancellationToken, task: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = parent.child_token();
        let handle = tokio::spawn(task(token.clone()));
        Self { token, handle }
    }

    fn cancel(self) {
        self.token.cancel();
        self.handle.abort();
    }
}

/// Stop the task in `slot`, if any
///
/// A task must never call this on its own slot: aborting the running task
/// would cancel it at its next await. Tasks `take()` their slot instead.
fn stop(slot: &mut Option<TaskSlot>) {
    if let Some(task) = slot.take() {
        task.cancel();
    }
}

/// The bound session and everything that drives it
struct ActiveSession {
    session: PlaybackSession,

    /// `None` when the resource could not be opened
    handle: Option<Arc<dyn MediaHandle>>,

    /// Parent of every task token below
    token: CancellationToken,

    listener: Option<TaskSlot>,
    sampler: Option<TaskSlot>,
    fade: Option<TaskSlot>,
    autoplay: Option<TaskSlot>,
}

impl ActiveSession {
    fn id(&self) -> u64 {
        self.session.id()
    }

    /// Push the session's audible level to the engine
    fn sync_volume(&self) {
        if let Some(handle) = &self.handle {
            handle.set_volume(self.session.effective_volume());
        }
    }

    /// Pull the engine position into the session (playing only)
    fn refresh_position(&mut self) {
        if let Some(handle) = &self.handle {
            self.session.sample(handle.position());
        }
    }

    fn stop_transport_tasks(&mut self) {
        stop(&mut self.sampler);
        stop(&mut self.fade);
        stop(&mut self.autoplay);
    }

    fn teardown(mut self) -> PlaybackSession {
        self.token.cancel();
        self.stop_transport_tasks();
        stop(&mut self.listener);
        self.session.cancel_fade();

        if let Some(handle) = self.handle.take() {
            handle.pause();
            handle.release();
        }

        self.session
    }
}

struct Inner {
    next_id: u64,
    active: Option<ActiveSession>,
    events: EventQueue,
}

struct Shared {
    inner: Mutex<Inner>,
    snapshot_tx: watch::Sender<PlaybackSnapshot>,
    config: PlaybackConfig,
    backend: Arc<dyn MediaBackend>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on the active session and publish the result
    ///
    /// With `Some(id)` the call is dropped unless that session is still bound.
    fn update<R>(&self, id: Option<u64>, f: impl FnOnce(&mut ActiveSession) -> R) -> Option<R> {
        let mut inner = self.lock();
        let active = inner
            .active
            .as_mut()
            .filter(|active| id.is_none() || id == Some(active.id()))?;

        let result = f(active);
        self.publish(&mut inner);
        Some(result)
    }

    /// Collect pending session events and broadcast the snapshot if it changed
    fn publish(&self, inner: &mut Inner) {
        let Inner { active, events, .. } = inner;

        let snapshot = match active {
            Some(active) => {
                for event in active.session.drain_events() {
                    events.push(event);
                }
                active.session.snapshot()
            }
            None => PlaybackSnapshot::idle(self.config.default_volume),
        };

        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn dispose(&self) {
        let mut inner = self.lock();
        let Some(active) = inner.active.take() else {
            return;
        };

        let id = active.id();
        let mut session = active.teardown();
        for event in session.drain_events() {
            inner.events.push(event);
        }
        self.publish(&mut inner);

        info!(session = id, "Session disposed");
    }

    // ===== Engine callbacks =====

    fn on_metadata(self: &Arc<Self>, id: u64, duration: f64) {
        self.update(Some(id), |active| {
            if let Err(e) = active.session.metadata_loaded(duration) {
                debug!(session = id, error = %e, "Ignoring metadata");
                return;
            }

            active.sync_volume();
            info!(
                session = id,
                duration = active.session.duration(),
                "Track ready"
            );

            let options = active.session.options();
            if options.auto_play {
                let delay = self.config.autoplay_delay(options);
                let shared = Arc::clone(self);
                active.autoplay = Some(TaskSlot::spawn(&active.token, |token| {
                    shared.run_autoplay(id, delay, token)
                }));
            }
        });
    }

    fn on_ended(self: &Arc<Self>, id: u64) {
        self.update(Some(id), |active| match active.session.natural_end() {
            Some(EndOutcome::Looped) => {
                debug!(session = id, "Restarting looped track");
                // Engines that loop natively never get here
                if let Some(handle) = active.handle.clone() {
                    handle.seek_to(0.0);
                    tokio::spawn(async move {
                        if let Err(e) = handle.play().await {
                            warn!(session = id, error = %e, "Loop restart rejected");
                        }
                    });
                }
            }
            Some(EndOutcome::Ended) => {
                stop(&mut active.sampler);
                stop(&mut active.fade);
                if let Some(handle) = &active.handle {
                    handle.seek_to(0.0);
                }
                info!(session = id, "Track ended");
            }
            None => debug!(session = id, "Ignoring end of track"),
        });
    }

    fn on_engine_error(&self, id: u64, message: String) {
        self.update(Some(id), |active| {
            if active.session.fail(message.as_str()).is_err() {
                return;
            }

            active.stop_transport_tasks();
            if let Some(handle) = &active.handle {
                handle.pause();
            }
            error!(session = id, error = %message, "Failed to load audio");
        });
    }

    // ===== Transport =====

    /// Start playback of session `id`
    ///
    /// No-op unless the session is bound and in a playable state.
    async fn start_playback(self: &Arc<Self>, id: Option<u64>, autoplay: bool) -> Result<()> {
        let prepared = self.update(id, |active| {
            if !active.session.state().is_playable() {
                return None;
            }
            let handle = active.handle.clone()?;

            if !autoplay {
                stop(&mut active.autoplay);
            }
            if active.session.state() == PlaybackState::Ended {
                handle.seek_to(0.0);
            }
            Some((active.id(), handle))
        });

        let Some((id, handle)) = prepared.flatten() else {
            return Ok(());
        };

        // Engine confirmation is awaited without holding the lock
        match handle.play().await {
            Ok(()) => {
                let confirmed = self.update(Some(id), |active| {
                    if active.session.start_playing().is_err() {
                        // Failed or disposed-and-replaced while waiting
                        if active.session.state() != PlaybackState::Playing {
                            handle.pause();
                        }
                        return false;
                    }

                    self.start_sampler(active);
                    if active.session.begin_fade() {
                        active.sync_volume();
                        self.start_fade(active);
                    }
                    info!(session = id, autoplay, "Playback started");
                    true
                });

                if confirmed.is_none() {
                    debug!(session = id, "Discarding stale play confirmation");
                    handle.pause();
                }
                Ok(())
            }
            Err(e) => {
                warn!(session = id, autoplay, error = %e, "Playback rejected");
                self.update(Some(id), |active| {
                    active.session.playback_rejected(e.to_string());
                    if autoplay {
                        active.session.abandon_pending_fade();
                        active.sync_volume();
                    }
                });
                Err(e)
            }
        }
    }

    fn start_sampler(self: &Arc<Self>, active: &mut ActiveSession) {
        stop(&mut active.sampler);
        let id = active.id();
        let period = self.config.sample_interval();
        let shared = Arc::clone(self);
        active.sampler = Some(TaskSlot::spawn(&active.token, |token| {
            shared.run_sampler(id, period, token)
        }));
    }

    fn start_fade(self: &Arc<Self>, active: &mut ActiveSession) {
        stop(&mut active.fade);
        let id = active.id();
        let period = self.config.fade_interval();
        let shared = Arc::clone(self);
        active.fade = Some(TaskSlot::spawn(&active.token, |token| {
            shared.run_fade(id, period, token)
        }));
    }

    // ===== Tasks =====

    async fn run_listener(self: Arc<Self>, id: u64, mut events: MediaEvents, token: CancellationToken) {
        loop {
            let event = tokio::select! {
                () = token.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match event {
                MediaEvent::MetadataLoaded { duration } => self.on_metadata(id, duration),
                MediaEvent::Ended => self.on_ended(id),
                MediaEvent::Error { message } => self.on_engine_error(id, message),
            }
        }

        debug!(session = id, "Media listener stopped");
    }

    async fn run_autoplay(self: Arc<Self>, id: u64, delay: Duration, token: CancellationToken) {
        tokio::select! {
            () = token.cancelled() => return,
            () = tokio::time::sleep(delay) => {}
        }

        // Detach from our slot so the play path cannot abort this task
        let still_bound = self.update(Some(id), |active| {
            drop(active.autoplay.take());
        });
        if still_bound.is_none() || token.is_cancelled() {
            return;
        }

        // Rejections are logged and recorded by `start_playback`
        let _ = self.start_playback(Some(id), true).await;
    }

    async fn run_sampler(self: Arc<Self>, id: u64, period: Duration, token: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let playing = self.update(Some(id), |active| {
                if active.session.state() != PlaybackState::Playing {
                    return false;
                }
                active.refresh_position();
                true
            });

            if playing != Some(true) {
                break;
            }
        }
    }

    async fn run_fade(self: Arc<Self>, id: u64, period: Duration, token: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let running = self.update(Some(id), |active| {
                let step = active.session.fade_step();
                active.sync_volume();

                match step {
                    Some(step) if !step.completed => true,
                    _ => {
                        debug!(session = id, level = active.session.volume(), "Fade finished");
                        drop(active.fade.take());
                        false
                    }
                }
            });

            if running != Some(true) {
                break;
            }
        }
    }
}

/// Audio playback controller for one player instance
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use storyvibe_playback::{
///     PlaybackController, SessionOptions, SimulatedBackend, SimulatedTrack,
/// };
///
/// # async fn example() -> storyvibe_playback::Result<()> {
/// let backend = SimulatedBackend::new()
///     .with_track("https://cdn.example.com/rain.mp3", SimulatedTrack::new(120.0));
/// let controller = PlaybackController::new(Arc::new(backend));
///
/// controller.load("https://cdn.example.com/rain.mp3", SessionOptions::default())?;
/// let mut updates = controller.subscribe();
/// updates.wait_for(|s| s.state.is_playable()).await.ok();
///
/// controller.play().await?;
/// controller.skip_forward();
/// controller.pause();
/// controller.dispose();
/// # Ok(())
/// # }
/// ```
pub struct PlaybackController {
    shared: Arc<Shared>,
}

impl PlaybackController {
    /// Create a controller with the default configuration
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self::build(backend, PlaybackConfig::default())
    }

    /// Create a controller with a custom configuration
    ///
    /// # Errors
    /// `PlaybackError::InvalidConfig` if `config` fails validation.
    pub fn with_config(backend: Arc<dyn MediaBackend>, config: PlaybackConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(backend, config))
    }

    fn build(backend: Arc<dyn MediaBackend>, config: PlaybackConfig) -> Self {
        let (snapshot_tx, _) = watch::channel(PlaybackSnapshot::idle(config.default_volume));

        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    next_id: 1,
                    active: None,
                    events: EventQueue::default(),
                }),
                snapshot_tx,
                config,
                backend,
            }),
        }
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.shared.config
    }

    /// Bind a new session to `source_url`
    ///
    /// Disposes any session already bound. Returns once the resource has been
    /// requested; readiness arrives asynchronously (`Loading` → `Ready`).
    ///
    /// # Errors
    /// `PlaybackError::ResourceLoad` when the URL is not a valid Media Origin
    /// URL or the engine refuses to open it. The new session is `Failed`.
    pub fn load(&self, source_url: &str, options: SessionOptions) -> Result<()> {
        self.shared.dispose();

        let shared = &self.shared;
        let mut inner = shared.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        let source_url = source_url.trim();
        let mut session = PlaybackSession::new(id, source_url, options, &shared.config);
        session.begin_loading()?;
        info!(session = id, url = %source_url, "Loading track");

        let opened = storyvibe_core::parse_source_url(source_url)
            .map_err(|e| PlaybackError::ResourceLoad(e.to_string()))
            .and_then(|url| {
                shared
                    .backend
                    .open(&url, session.options().loop_playback)
                    .map_err(|e| match e {
                        e @ PlaybackError::ResourceLoad(_) => e,
                        other => PlaybackError::ResourceLoad(other.to_string()),
                    })
            });

        let token = CancellationToken::new();
        let result = match opened {
            Ok(resource) => {
                resource.handle.set_volume(session.effective_volume());
                let listener_shared = Arc::clone(shared);
                let events = resource.events;
                let listener = TaskSlot::spawn(&token, |token| {
                    listener_shared.run_listener(id, events, token)
                });

                inner.active = Some(ActiveSession {
                    session,
                    handle: Some(resource.handle),
                    token,
                    listener: Some(listener),
                    sampler: None,
                    fade: None,
                    autoplay: None,
                });
                Ok(())
            }
            Err(e) => {
                error!(session = id, url = %source_url, error = %e, "Failed to open audio");
                session.fail(e.to_string())?;
                inner.active = Some(ActiveSession {
                    session,
                    handle: None,
                    token,
                    listener: None,
                    sampler: None,
                    fade: None,
                    autoplay: None,
                });
                Err(e)
            }
        };

        shared.publish(&mut inner);
        result
    }

    /// Start or resume playback
    ///
    /// Valid from `Ready`, `Paused` and `Ended` (replays from 0); a no-op in
    /// any other state. A manual play during the autoplay delay supersedes the
    /// autoplay timer and runs the pending fade-in.
    ///
    /// # Errors
    /// `PlaybackError::PlaybackRejected` when the engine refuses to start.
    /// The session state is unchanged.
    pub async fn play(&self) -> Result<()> {
        self.shared.start_playback(None, false).await
    }

    /// Pause playback, keeping the position
    ///
    /// Cancels any fade in progress. No-op unless `Playing`.
    pub fn pause(&self) {
        self.shared.update(None, |active| {
            if active.session.state() != PlaybackState::Playing {
                return;
            }

            active.refresh_position();
            if let Some(handle) = &active.handle {
                handle.pause();
            }
            if active.session.pause().is_ok() {
                stop(&mut active.sampler);
                stop(&mut active.fade);
                debug!(session = active.id(), position = active.session.position(), "Paused");
            }
        });
    }

    /// Jump to `target` seconds, clamped to `[0, duration]`
    ///
    /// Ignored while `Loading`, `Failed` or with no session bound.
    pub fn seek(&self, target: f64) {
        self.shared.update(None, |active| {
            if let Some(position) = active.session.seek(target) {
                if let Some(handle) = &active.handle {
                    handle.seek_to(position);
                }
            }
        });
    }

    /// Move the position by `delta` seconds, clamped
    pub fn skip(&self, delta: f64) {
        self.shared.update(None, |active| {
            active.refresh_position();
            let target = active.session.position() + delta;
            if let Some(position) = active.session.seek(target) {
                if let Some(handle) = &active.handle {
                    handle.seek_to(position);
                }
            }
        });
    }

    pub fn skip_forward(&self) {
        self.skip(self.shared.config.skip_seconds);
    }

    pub fn skip_backward(&self) {
        self.skip(-self.shared.config.skip_seconds);
    }

    /// Set the volume, clamped to `[0, 1]`
    ///
    /// A positive level clears mute. Cancels any pending or running fade.
    pub fn set_volume(&self, level: f32) {
        self.shared.update(None, |active| {
            active.session.set_volume(level);
            stop(&mut active.fade);
            active.sync_volume();
        });
    }

    /// Flip mute; unmuting at volume 0 restores the default volume
    pub fn toggle_mute(&self) {
        self.shared.update(None, |active| {
            active.session.toggle_mute();
            active.sync_volume();
        });
    }

    /// Tear down the bound session
    ///
    /// Cancels every timer, detaches engine listeners, then pauses and releases
    /// the resource. Safe to call any number of times.
    pub fn dispose(&self) {
        self.shared.dispose();
    }

    /// Current snapshot
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.shared.snapshot_tx.borrow().clone()
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.snapshot_tx.borrow().state
    }

    /// Receiver notified on every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    /// Take all events emitted since the last call
    pub fn drain_events(&self) -> Vec<PlaybackEvent> {
        let mut inner = self.shared.lock();
        self.shared.publish(&mut inner);
        inner.events.drain()
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.shared.dispose();
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("config", &self.shared.config)
            .field("snapshot", &*self.shared.snapshot_tx.borrow())
            .finish_non_exhaustive()
    }
}
