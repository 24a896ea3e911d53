//! Error types for playback control

use crate::types::PlaybackState;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The audio resource could not be fetched or decoded
    ///
    /// Terminal for the session: it stays `Failed` until a fresh `load`.
    #[error("Failed to load audio resource: {0}")]
    ResourceLoad(String),

    /// The media engine refused to start playback (e.g. autoplay policy)
    ///
    /// Non-terminal: the session keeps its state and a later `play` may succeed.
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    /// A state transition outside the session state machine was requested
    #[error("Invalid transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current state
        from: PlaybackState,
        /// Requested state
        to: PlaybackState,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
