//! Core types for playback control

use crate::error::{PlaybackError, Result};
use crate::fade::FadeCurve;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Volume restored on unmute when the level was zero, and the default fade target
pub const DEFAULT_VOLUME: f32 = 0.7;

/// Smallest accepted fade step; caps a full ramp at 1000 steps
pub const MIN_FADE_STEP: f32 = 0.001;

/// Playback state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No resource bound yet
    Idle,

    /// Resource requested, waiting for metadata
    Loading,

    /// Metadata loaded, not started
    Ready,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,

    /// Reached the natural end (non-looping tracks only)
    Ended,

    /// Resource could not be fetched or decoded
    Failed,
}

impl PlaybackState {
    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: PlaybackState) -> bool {
        use PlaybackState::{Ended, Failed, Idle, Loading, Paused, Playing, Ready};

        matches!(
            (self, next),
            (Idle, Loading)
                | (Loading, Ready | Failed)
                | (Ready, Playing | Failed)
                | (Playing, Paused | Ended | Failed)
                | (Paused, Playing | Failed)
                | (Ended, Playing | Failed)
        )
    }

    /// Whether `play()` may start playback from this state
    pub fn is_playable(self) -> bool {
        matches!(
            self,
            PlaybackState::Ready | PlaybackState::Paused | PlaybackState::Ended
        )
    }

    /// Whether `seek()` applies in this state
    pub fn is_seekable(self) -> bool {
        matches!(
            self,
            PlaybackState::Ready
                | PlaybackState::Playing
                | PlaybackState::Paused
                | PlaybackState::Ended
        )
    }
}

/// Per-session options supplied by the view when a player mounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Restart at the end of the track (default: true)
    #[serde(rename = "loop")]
    pub loop_playback: bool,

    /// Fade in on autoplay (default: true)
    pub fade_enabled: bool,

    /// Start playing once ready (default: false)
    pub auto_play: bool,

    /// Volume the session starts at, and the fade target (default: 0.7)
    pub initial_volume: f32,

    /// Show skip buttons next to play/pause (default: true)
    pub show_controls: bool,

    /// Display title (default: none, the view decides)
    pub title: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            loop_playback: true,
            fade_enabled: true,
            auto_play: false,
            initial_volume: DEFAULT_VOLUME,
            show_controls: true,
            title: None,
        }
    }
}

impl SessionOptions {
    /// Set the display title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Whether this session should fade in after autoplay
    pub fn fades_in(&self) -> bool {
        self.fade_enabled && self.auto_play
    }
}

/// Configuration for the playback controller
///
/// The fade cadence and increment are tuning knobs, not requirements; the
/// defaults reproduce the web player's ramp (0.01 every 50 ms).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Volume restored on unmute from zero (default: 0.7)
    pub default_volume: f32,

    /// Volume increment per fade step (default: 0.01)
    pub fade_step: f32,

    /// Time between fade steps in milliseconds (default: 50)
    pub fade_interval_ms: u64,

    /// Delay before a fading autoplay starts, in milliseconds (default: 1000)
    pub fade_start_delay_ms: u64,

    /// Delay before a plain autoplay starts, in milliseconds (default: 500)
    pub autoplay_delay_ms: u64,

    /// Position sampling period in milliseconds (default: 16, one display frame)
    pub sample_interval_ms: u64,

    /// Step used by skip buttons, in seconds (default: 10)
    pub skip_seconds: f64,

    /// Shape of the fade-in ramp (default: Linear)
    pub fade_curve: FadeCurve,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_volume: DEFAULT_VOLUME,
            fade_step: 0.01,
            fade_interval_ms: 50,
            fade_start_delay_ms: 1000,
            autoplay_delay_ms: 500,
            sample_interval_ms: 16,
            skip_seconds: 10.0,
            fade_curve: FadeCurve::Linear,
        }
    }
}

impl PlaybackConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(self.default_volume > 0.0 && self.default_volume <= 1.0) {
            return Err(PlaybackError::InvalidConfig(format!(
                "default_volume must be in (0, 1], got {}",
                self.default_volume
            )));
        }

        if !(self.fade_step >= MIN_FADE_STEP && self.fade_step <= 1.0) {
            return Err(PlaybackError::InvalidConfig(format!(
                "fade_step must be in [{MIN_FADE_STEP}, 1], got {}",
                self.fade_step
            )));
        }

        if self.fade_interval_ms == 0 || self.sample_interval_ms == 0 {
            return Err(PlaybackError::InvalidConfig(
                "fade_interval_ms and sample_interval_ms must be non-zero".to_string(),
            ));
        }

        if !(self.skip_seconds.is_finite() && self.skip_seconds > 0.0) {
            return Err(PlaybackError::InvalidConfig(format!(
                "skip_seconds must be positive, got {}",
                self.skip_seconds
            )));
        }

        Ok(())
    }

    pub fn fade_interval(&self) -> Duration {
        Duration::from_millis(self.fade_interval_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// Delay before autoplay starts for the given options
    pub fn autoplay_delay(&self, options: &SessionOptions) -> Duration {
        if options.fades_in() {
            Duration::from_millis(self.fade_start_delay_ms)
        } else {
            Duration::from_millis(self.autoplay_delay_ms)
        }
    }
}

/// Read-only view of a session for UI binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    /// Session state (`Idle` when no session is bound)
    pub state: PlaybackState,

    /// Current position in seconds
    pub position: f64,

    /// Track duration in seconds (0 until metadata loads)
    pub duration: f64,

    /// User volume in [0, 1]
    pub volume: f32,

    /// Mute flag, independent of `volume`
    pub muted: bool,

    /// Bound resource URL
    pub source_url: Option<String>,

    /// Display title
    pub title: Option<String>,

    /// Whether skip buttons are shown
    pub show_controls: bool,
}

impl PlaybackSnapshot {
    /// Snapshot of a player with no session bound
    pub fn idle(volume: f32) -> Self {
        Self {
            state: PlaybackState::Idle,
            position: 0.0,
            duration: 0.0,
            volume,
            muted: false,
            source_url: None,
            title: None,
            show_controls: true,
        }
    }

    /// Audible output level: 0 when muted, `volume` otherwise
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    /// Playback progress in [0, 1]
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.position / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
