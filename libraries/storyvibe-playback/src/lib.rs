//! StoryVibe - Chapter Music Playback
//!
//! Playback control for the background music attached to story chapters.
//!
//! This crate provides:
//! - A per-track session state machine (Idle → Loading → Ready → Playing ...)
//! - Transport controls (play, pause, clamped seek, ±10 s skip)
//! - Volume with an independent mute flag
//! - Fade-in after autoplay (0 → 0.7 in 0.01 steps every 50 ms by default)
//! - Snapshot broadcasting over a `watch` channel for UI binding
//! - View helpers (`m:ss` formatting, player widget state)
//!
//! # Architecture
//!
//! `storyvibe-playback` never decodes audio. The host supplies a
//! [`MediaBackend`] that opens streamable resources and reports metadata,
//! end-of-track and errors as [`MediaEvent`]s. A [`SimulatedBackend`] driven
//! by the Tokio clock is included for headless previews and tests.
//!
//! # Example: Autoplay with fade-in
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use storyvibe_playback::{
//!     PlaybackController, PlaybackState, SessionOptions, SimulatedBackend, SimulatedTrack,
//! };
//!
//! # async fn example() -> storyvibe_playback::Result<()> {
//! let url = "https://cdn.example.com/chapter-1.mp3";
//! let backend = SimulatedBackend::new().with_track(url, SimulatedTrack::new(95.0));
//! let controller = PlaybackController::new(Arc::new(backend));
//!
//! let options = SessionOptions {
//!     auto_play: true,
//!     ..SessionOptions::default()
//! };
//! controller.load(url, options)?;
//!
//! // Ready after metadata, Playing one second later, then the volume ramps up
//! let mut updates = controller.subscribe();
//! updates
//!     .wait_for(|s| s.state == PlaybackState::Playing)
//!     .await
//!     .ok();
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Rendering the player
//!
//! ```rust
//! use storyvibe_playback::{display::PlayerView, PlaybackSnapshot};
//!
//! let view = PlayerView::from_snapshot(&PlaybackSnapshot::idle(0.7));
//! assert_eq!(view, PlayerView::Hidden);
//! ```

mod controller;
pub mod display;
mod engine;
mod error;
mod events;
mod fade;
mod session;
mod simulated;
pub mod types;
mod volume;

// Public exports
pub use controller::PlaybackController;
pub use engine::{MediaBackend, MediaEvent, MediaEvents, MediaHandle, MediaResource};
pub use error::{PlaybackError, Result};
pub use events::PlaybackEvent;
pub use fade::{FadeCurve, FadeRamp};
pub use session::{EndOutcome, FadeStep, PlaybackSession};
pub use simulated::{SimulatedBackend, SimulatedHandle, SimulatedTrack};
pub use types::{
    PlaybackConfig, PlaybackSnapshot, PlaybackState, SessionOptions, DEFAULT_VOLUME, MIN_FADE_STEP,
};
pub use volume::Volume;
