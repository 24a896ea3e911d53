//! Playback session - the per-track state machine
//!
//! A session is the state bound to one loaded track inside one player
//! instance. It owns no timers and performs no I/O: the controller feeds it
//! media engine callbacks and user intents, and it decides which transitions
//! are legal and what the UI should see.

use crate::{
    error::{PlaybackError, Result},
    events::{EventQueue, PlaybackEvent},
    fade::{FadeCurve, FadeRamp},
    types::{PlaybackConfig, PlaybackSnapshot, PlaybackState, SessionOptions},
    volume::Volume,
};
use tracing::debug;

/// Fade-in lifecycle within a session
#[derive(Debug, Clone)]
enum FadePhase {
    /// No fade scheduled
    Idle,

    /// Volume forced to 0, waiting for autoplay to start the ramp
    Pending(FadeRamp),

    /// Ramp in progress
    Active(FadeRamp),
}

/// Result of a single fade step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeStep {
    /// Level applied by this step
    pub level: f32,
    /// Whether this step reached the target
    pub completed: bool,
}

/// What happened when the engine reported the natural end of the track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOutcome {
    /// Track restarts from 0, session stays `Playing`
    Looped,
    /// Session moved to `Ended`
    Ended,
}

/// Runtime state bound to one loaded track
#[derive(Debug)]
pub struct PlaybackSession {
    id: u64,
    source_url: String,
    options: SessionOptions,
    state: PlaybackState,

    /// `None` until metadata reports a finite duration
    duration: Option<f64>,
    position: f64,

    volume: Volume,
    fade: FadePhase,
    fade_step: f32,
    fade_curve: FadeCurve,

    events: EventQueue,
}

impl PlaybackSession {
    /// Create a session in `Idle`
    pub fn new(
        id: u64,
        source_url: impl Into<String>,
        options: SessionOptions,
        config: &PlaybackConfig,
    ) -> Self {
        let volume = Volume::new(options.initial_volume).with_fallback(config.default_volume);

        Self {
            id,
            source_url: source_url.into(),
            options,
            state: PlaybackState::Idle,
            duration: None,
            position: 0.0,
            volume,
            fade: FadePhase::Idle,
            fade_step: config.fade_step,
            fade_curve: config.fade_curve,
            events: EventQueue::default(),
        }
    }

    // ===== Accessors =====

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Duration in seconds, 0 while unknown
    pub fn duration(&self) -> f64 {
        self.duration.unwrap_or(0.0)
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn volume(&self) -> f32 {
        self.volume.level()
    }

    pub fn is_muted(&self) -> bool {
        self.volume.is_muted()
    }

    /// Level the engine should output right now
    pub fn effective_volume(&self) -> f32 {
        self.volume.effective()
    }

    pub fn is_fading(&self) -> bool {
        matches!(self.fade, FadePhase::Active(_))
    }

    pub fn has_pending_fade(&self) -> bool {
        matches!(self.fade, FadePhase::Pending(_))
    }

    // ===== Transitions =====

    fn transition(&mut self, next: PlaybackState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            debug!(session = self.id, from = ?self.state, to = ?next, "Refused transition");
            return Err(PlaybackError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        debug!(session = self.id, from = ?self.state, to = ?next, "Transition");
        self.state = next;
        self.events
            .push(PlaybackEvent::StateChanged { state: next });
        Ok(())
    }

    /// Idle → Loading
    pub fn begin_loading(&mut self) -> Result<()> {
        self.transition(PlaybackState::Loading)
    }

    /// Loading → Ready once metadata is known
    ///
    /// Sessions that fade in on autoplay drop to volume 0 here and hold the
    /// ramp until playback actually starts.
    pub fn metadata_loaded(&mut self, duration: f64) -> Result<()> {
        self.transition(PlaybackState::Ready)?;

        self.duration = (duration.is_finite() && duration >= 0.0).then_some(duration);
        self.position = 0.0;

        if self.options.fades_in() {
            let ramp = FadeRamp::new(self.options.initial_volume, self.fade_step, self.fade_curve);
            self.volume.ramp_to(0.0);
            self.fade = FadePhase::Pending(ramp);
            self.push_volume_changed();
        }

        Ok(())
    }

    /// Any live state → Failed
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.transition(PlaybackState::Failed)?;
        self.fade = FadePhase::Idle;
        self.events.push(PlaybackEvent::Error {
            message: message.into(),
            fatal: true,
        });
        Ok(())
    }

    /// Ready/Paused/Ended → Playing
    ///
    /// Replaying from `Ended` restarts at 0.
    pub fn start_playing(&mut self) -> Result<()> {
        let replay = self.state == PlaybackState::Ended;
        self.transition(PlaybackState::Playing)?;
        if replay {
            self.set_position(0.0);
        }
        Ok(())
    }

    /// Playing → Paused, cancelling any fade in progress
    pub fn pause(&mut self) -> Result<()> {
        self.transition(PlaybackState::Paused)?;
        self.cancel_fade();
        Ok(())
    }

    /// Record a non-fatal play rejection
    pub fn playback_rejected(&mut self, message: impl Into<String>) {
        self.events.push(PlaybackEvent::Error {
            message: message.into(),
            fatal: false,
        });
    }

    /// Handle the engine's end-of-track signal
    ///
    /// Returns `None` when the session is not playing.
    pub fn natural_end(&mut self) -> Option<EndOutcome> {
        if self.state != PlaybackState::Playing {
            return None;
        }

        if self.options.loop_playback {
            self.set_position(0.0);
            self.events.push(PlaybackEvent::TrackEnded { looped: true });
            return Some(EndOutcome::Looped);
        }

        self.transition(PlaybackState::Ended).ok()?;
        self.cancel_fade();
        self.set_position(0.0);
        self.events.push(PlaybackEvent::TrackEnded { looped: false });
        Some(EndOutcome::Ended)
    }

    // ===== Position =====

    /// Clamp a target into [0, duration]
    ///
    /// Without a known duration only the lower bound applies.
    pub fn clamp_position(&self, target: f64) -> f64 {
        let lower = target.max(0.0);
        match self.duration {
            Some(duration) => lower.min(duration),
            None => lower,
        }
    }

    /// Jump to `target`, clamped
    ///
    /// Returns the applied position, or `None` when seeking is not allowed in
    /// the current state or the target is not finite.
    pub fn seek(&mut self, target: f64) -> Option<f64> {
        if !self.state.is_seekable() || !target.is_finite() {
            return None;
        }

        let position = self.clamp_position(target);
        self.set_position(position);
        Some(position)
    }

    /// Republish the engine position while playing
    ///
    /// Returns whether the position changed.
    pub fn sample(&mut self, engine_position: f64) -> bool {
        if self.state != PlaybackState::Playing || !engine_position.is_finite() {
            return false;
        }

        let position = self.clamp_position(engine_position);
        if position == self.position {
            return false;
        }

        self.set_position(position);
        true
    }

    fn set_position(&mut self, position: f64) {
        self.position = position;
        self.events.push(PlaybackEvent::PositionUpdate {
            position,
            duration: self.duration(),
        });
    }

    // ===== Volume =====

    /// Set the user volume, pre-empting any fade
    pub fn set_volume(&mut self, level: f32) {
        self.cancel_fade();
        self.volume.set_level(level);
        self.push_volume_changed();
    }

    pub fn toggle_mute(&mut self) {
        self.volume.toggle_mute();
        self.push_volume_changed();
    }

    fn push_volume_changed(&mut self) {
        self.events.push(PlaybackEvent::VolumeChanged {
            level: self.volume.level(),
            is_muted: self.volume.is_muted(),
        });
    }

    // ===== Fade =====

    /// Promote a pending fade to active
    ///
    /// Returns whether a fade is now running.
    pub fn begin_fade(&mut self) -> bool {
        let FadePhase::Pending(ramp) = std::mem::replace(&mut self.fade, FadePhase::Idle) else {
            return false;
        };

        if ramp.is_complete() {
            return false;
        }

        self.events.push(PlaybackEvent::FadeStarted {
            target: ramp.target(),
            steps: ramp.steps(),
        });
        self.fade = FadePhase::Active(ramp);
        true
    }

    /// Advance the active fade by one step
    pub fn fade_step(&mut self) -> Option<FadeStep> {
        let FadePhase::Active(ramp) = &mut self.fade else {
            return None;
        };

        let Some(level) = ramp.next_level() else {
            self.fade = FadePhase::Idle;
            return None;
        };

        let completed = ramp.is_complete();
        self.volume.ramp_to(level);
        self.push_volume_changed();

        if completed {
            self.fade = FadePhase::Idle;
            self.events.push(PlaybackEvent::FadeCompleted);
        }

        Some(FadeStep { level, completed })
    }

    /// Drop a pending fade and put the volume back at its target
    ///
    /// Used when autoplay is rejected so a later manual play is audible.
    pub fn abandon_pending_fade(&mut self) {
        if let FadePhase::Pending(ramp) = std::mem::replace(&mut self.fade, FadePhase::Idle) {
            self.volume.ramp_to(ramp.target());
            self.push_volume_changed();
        }
    }

    /// Cancel a pending or active fade
    ///
    /// Returns whether anything was cancelled.
    pub fn cancel_fade(&mut self) -> bool {
        match std::mem::replace(&mut self.fade, FadePhase::Idle) {
            FadePhase::Idle => false,
            FadePhase::Pending(_) => true,
            FadePhase::Active(_) => {
                self.events.push(PlaybackEvent::FadeCancelled);
                true
            }
        }
    }

    // ===== UI =====

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state,
            position: self.position,
            duration: self.duration(),
            volume: self.volume.level(),
            muted: self.volume.is_muted(),
            source_url: Some(self.source_url.clone()),
            title: self.options.title.clone(),
            show_controls: self.options.show_controls,
        }
    }

    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        self.events.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(loop_playback: bool, fade_enabled: bool, auto_play: bool) -> SessionOptions {
        SessionOptions {
            loop_playback,
            fade_enabled,
            auto_play,
            ..SessionOptions::default()
        }
    }

    fn ready_session(options: SessionOptions, duration: f64) -> PlaybackSession {
        let mut session = PlaybackSession::new(
            1,
            "https://cdn.example.com/track.mp3",
            options,
            &PlaybackConfig::default(),
        );
        session.begin_loading().unwrap();
        session.metadata_loaded(duration).unwrap();
        session
    }

    #[test]
    fn load_walks_idle_loading_ready() {
        let mut session = PlaybackSession::new(
            7,
            "https://cdn.example.com/a.mp3",
            SessionOptions::default(),
            &PlaybackConfig::default(),
        );
        assert_eq!(session.state(), PlaybackState::Idle);

        session.begin_loading().unwrap();
        assert_eq!(session.state(), PlaybackState::Loading);

        session.metadata_loaded(120.0).unwrap();
        assert_eq!(session.state(), PlaybackState::Ready);
        assert_eq!(session.duration(), 120.0);
        assert_eq!(session.position(), 0.0);

        let states: Vec<_> = session
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                PlaybackEvent::StateChanged { state } => Some(state),
                _ => None,
            })
            .collect();
        assert_eq!(states, vec![PlaybackState::Loading, PlaybackState::Ready]);
    }

    #[test]
    fn metadata_before_loading_is_refused() {
        let mut session = PlaybackSession::new(
            1,
            "https://cdn.example.com/a.mp3",
            SessionOptions::default(),
            &PlaybackConfig::default(),
        );
        assert!(matches!(
            session.metadata_loaded(10.0),
            Err(PlaybackError::InvalidTransition { .. })
        ));
        assert_eq!(session.state(), PlaybackState::Idle);
    }

    #[test]
    fn failed_session_ignores_transport() {
        let mut session = PlaybackSession::new(
            1,
            "https://cdn.example.com/a.mp3",
            SessionOptions::default(),
            &PlaybackConfig::default(),
        );
        session.begin_loading().unwrap();
        session.fail("404").unwrap();

        assert!(session.start_playing().is_err());
        assert!(session.pause().is_err());
        assert_eq!(session.seek(10.0), None);
        assert_eq!(session.state(), PlaybackState::Failed);
    }

    #[test]
    fn seek_clamps_to_duration() {
        let mut session = ready_session(options(false, false, false), 120.0);

        assert_eq!(session.seek(90.0), Some(90.0));
        assert_eq!(session.seek(500.0), Some(120.0));
        assert_eq!(session.seek(-5.0), Some(0.0));
        assert_eq!(session.seek(f64::NAN), None);
        assert_eq!(session.position(), 0.0);
    }

    #[test]
    fn seek_is_ignored_while_loading() {
        let mut session = PlaybackSession::new(
            1,
            "https://cdn.example.com/a.mp3",
            SessionOptions::default(),
            &PlaybackConfig::default(),
        );
        session.begin_loading().unwrap();
        assert_eq!(session.seek(3.0), None);
    }

    #[test]
    fn unknown_duration_only_clamps_below() {
        let mut session = ready_session(options(false, false, false), f64::INFINITY);
        assert_eq!(session.duration(), 0.0);
        assert_eq!(session.seek(42.0), Some(42.0));
        assert_eq!(session.seek(-1.0), Some(0.0));
    }

    #[test]
    fn infinite_targets_leave_position_alone() {
        let mut session = ready_session(options(false, false, false), f64::INFINITY);
        session.start_playing().unwrap();
        assert_eq!(session.seek(42.0), Some(42.0));

        assert_eq!(session.seek(f64::INFINITY), None);
        assert_eq!(session.seek(f64::NEG_INFINITY), None);
        assert!(!session.sample(f64::INFINITY));
        assert_eq!(session.position(), 42.0);
    }

    #[test]
    fn sampling_only_while_playing() {
        let mut session = ready_session(options(false, false, false), 60.0);
        assert!(!session.sample(5.0));

        session.start_playing().unwrap();
        assert!(session.sample(5.0));
        assert_eq!(session.position(), 5.0);
        assert!(!session.sample(5.0));

        assert!(session.sample(75.0));
        assert_eq!(session.position(), 60.0);
        assert_eq!(session.state(), PlaybackState::Playing);
    }

    #[test]
    fn natural_end_without_loop() {
        let mut session = ready_session(options(false, false, false), 30.0);
        session.start_playing().unwrap();
        session.sample(30.0);

        assert_eq!(session.natural_end(), Some(EndOutcome::Ended));
        assert_eq!(session.state(), PlaybackState::Ended);
        assert_eq!(session.position(), 0.0);

        // Replay from the start
        session.seek(12.0);
        session.start_playing().unwrap();
        assert_eq!(session.position(), 0.0);
        assert_eq!(session.state(), PlaybackState::Playing);
    }

    #[test]
    fn natural_end_with_loop_keeps_playing() {
        let mut session = ready_session(options(true, false, false), 30.0);
        session.start_playing().unwrap();
        session.sample(29.9);

        assert_eq!(session.natural_end(), Some(EndOutcome::Looped));
        assert_eq!(session.state(), PlaybackState::Playing);
        assert_eq!(session.position(), 0.0);
    }

    #[test]
    fn natural_end_ignored_when_paused() {
        let mut session = ready_session(options(false, false, false), 30.0);
        session.start_playing().unwrap();
        session.pause().unwrap();
        assert_eq!(session.natural_end(), None);
        assert_eq!(session.state(), PlaybackState::Paused);
    }

    #[test]
    fn fading_autoplay_starts_silent() {
        let session = ready_session(options(true, true, true), 60.0);
        assert_eq!(session.volume(), 0.0);
        assert!(session.has_pending_fade());
    }

    #[test]
    fn fade_ramps_to_initial_volume() {
        let mut session = ready_session(options(true, true, true), 60.0);
        session.start_playing().unwrap();
        assert!(session.begin_fade());

        let mut levels = Vec::new();
        while let Some(step) = session.fade_step() {
            levels.push(step.level);
            if step.completed {
                break;
            }
        }

        assert_eq!(levels.len(), 70);
        assert!(levels.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(session.volume(), 0.7);
        assert!(!session.is_fading());
        assert!(session
            .drain_events()
            .contains(&PlaybackEvent::FadeCompleted));
    }

    #[test]
    fn manual_volume_cancels_fade() {
        let mut session = ready_session(options(true, true, true), 60.0);
        session.start_playing().unwrap();
        session.begin_fade();
        session.fade_step();
        session.fade_step();

        session.set_volume(0.4);
        assert!(!session.is_fading());
        assert_eq!(session.fade_step(), None);
        assert_eq!(session.volume(), 0.4);
    }

    #[test]
    fn manual_volume_before_autoplay_drops_pending_fade() {
        let mut session = ready_session(options(true, true, true), 60.0);
        session.set_volume(0.3);
        assert!(!session.has_pending_fade());
        session.start_playing().unwrap();
        assert!(!session.begin_fade());
        assert_eq!(session.volume(), 0.3);
    }

    #[test]
    fn pause_cancels_fade() {
        let mut session = ready_session(options(true, true, true), 60.0);
        session.start_playing().unwrap();
        session.begin_fade();
        let step = session.fade_step().unwrap();

        session.pause().unwrap();
        assert!(!session.is_fading());
        assert_eq!(session.volume(), step.level);
    }

    #[test]
    fn abandoned_fade_restores_target() {
        let mut session = ready_session(options(true, true, true), 60.0);
        session.abandon_pending_fade();
        assert_eq!(session.volume(), 0.7);
        assert!(!session.has_pending_fade());
    }

    #[test]
    fn volume_zero_is_not_mute() {
        let mut session = ready_session(options(true, false, false), 60.0);

        session.set_volume(0.0);
        assert!(!session.is_muted());
        assert_eq!(session.effective_volume(), 0.0);

        session.set_volume(0.3);
        assert!(!session.is_muted());
        assert_eq!(session.effective_volume(), 0.3);
    }

    #[test]
    fn snapshot_reflects_session() {
        let mut session = ready_session(
            options(false, false, false).with_title("Rain"),
            120.0,
        );
        session.seek(30.0);
        session.toggle_mute();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, PlaybackState::Ready);
        assert_eq!(snapshot.position, 30.0);
        assert_eq!(snapshot.duration, 120.0);
        assert!(snapshot.muted);
        assert_eq!(snapshot.effective_volume(), 0.0);
        assert_eq!(snapshot.title.as_deref(), Some("Rain"));
    }
}
