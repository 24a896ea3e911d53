//! View helpers for player UIs
//!
//! Pure functions from a [`PlaybackSnapshot`] to what a player widget shows.
//! Nothing here touches the controller.

use crate::types::{PlaybackSnapshot, PlaybackState};
use serde::Serialize;
use storyvibe_core::DEFAULT_TRACK_TITLE;

pub const LOADING_MESSAGE: &str = "Loading music...";
pub const FAILED_MESSAGE: &str = "Failed to load audio file";

/// Format seconds as `m:ss`
///
/// Non-finite and negative inputs render as `0:00`.
///
/// ```
/// use storyvibe_playback::display::format_time;
///
/// assert_eq!(format_time(75.4), "1:15");
/// assert_eq!(format_time(f64::NAN), "0:00");
/// ```
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }

    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// `"current / total"` label under the progress bar
pub fn time_label(position: f64, duration: f64) -> String {
    format!("{} / {}", format_time(position), format_time(duration))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayButton {
    Play,
    Pause,
}

impl PlayButton {
    pub fn aria_label(self) -> &'static str {
        match self {
            PlayButton::Play => "Play",
            PlayButton::Pause => "Pause",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MuteButton {
    Muted,
    Unmuted,
}

impl MuteButton {
    pub fn aria_label(self) -> &'static str {
        match self {
            MuteButton::Muted => "Unmute",
            MuteButton::Unmuted => "Mute",
        }
    }
}

/// Transport controls for a bound track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlsView {
    pub title: String,
    /// Skip buttons visible
    pub show_controls: bool,
    pub play_button: PlayButton,
    pub mute_button: MuteButton,
    /// Slider value; 0 while muted
    pub volume_slider: f32,
    pub position: f64,
    pub duration: f64,
    pub time_label: String,
}

/// What the player widget renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlayerView {
    /// No session bound
    Hidden,
    Loading { message: &'static str },
    Failed { message: &'static str },
    Controls(ControlsView),
}

impl PlayerView {
    pub fn from_snapshot(snapshot: &PlaybackSnapshot) -> Self {
        match snapshot.state {
            PlaybackState::Idle => PlayerView::Hidden,
            PlaybackState::Loading => PlayerView::Loading {
                message: LOADING_MESSAGE,
            },
            PlaybackState::Failed => PlayerView::Failed {
                message: FAILED_MESSAGE,
            },
            PlaybackState::Ready
            | PlaybackState::Playing
            | PlaybackState::Paused
            | PlaybackState::Ended => PlayerView::Controls(ControlsView::from_snapshot(snapshot)),
        }
    }
}

impl ControlsView {
    fn from_snapshot(snapshot: &PlaybackSnapshot) -> Self {
        let title = snapshot
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TRACK_TITLE)
            .to_string();

        let play_button = if snapshot.state == PlaybackState::Playing {
            PlayButton::Pause
        } else {
            PlayButton::Play
        };

        let mute_button = if snapshot.muted || snapshot.volume == 0.0 {
            MuteButton::Muted
        } else {
            MuteButton::Unmuted
        };

        Self {
            title,
            show_controls: snapshot.show_controls,
            play_button,
            mute_button,
            volume_slider: snapshot.effective_volume(),
            position: snapshot.position,
            duration: snapshot.duration,
            time_label: time_label(snapshot.position, snapshot.duration),
        }
    }
}
