//! Host media engine abstraction
//!
//! The controller never decodes audio itself. A [`MediaBackend`] opens a
//! streamable resource (the equivalent of constructing an audio element) and
//! hands back a [`MediaHandle`] for transport calls plus a channel of
//! [`MediaEvent`]s the engine raises asynchronously.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Asynchronous notifications from the media engine
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Metadata is available and the resource can play
    MetadataLoaded {
        /// Track duration in seconds (may be non-finite for live streams)
        duration: f64,
    },

    /// Playback reached the end of a non-looping resource
    Ended,

    /// The resource could not be fetched or decoded
    Error {
        /// Engine-provided description
        message: String,
    },
}

/// Receiving side of an engine's event stream
pub type MediaEvents = mpsc::UnboundedReceiver<MediaEvent>;

/// An opened media resource
pub struct MediaResource {
    /// Transport handle, exclusively owned by one playback session
    pub handle: Arc<dyn MediaHandle>,

    /// Engine events for this resource; dropping it detaches all listeners
    pub events: MediaEvents,
}

impl std::fmt::Debug for MediaResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaResource").finish_non_exhaustive()
    }
}

/// Factory for media resources
///
/// Implementors wrap whatever the host provides (a browser audio element,
/// a native decoder and output stream, a simulation).
pub trait MediaBackend: Send + Sync {
    /// Start fetching `url`
    ///
    /// Returns immediately; readiness and failures arrive as [`MediaEvent`]s.
    /// An `Err` means the resource could not even be requested.
    ///
    /// # Arguments
    /// * `url` - Media Origin URL
    /// * `looping` - Whether the engine restarts natively at the end
    fn open(&self, url: &Url, looping: bool) -> Result<MediaResource>;
}

/// Transport controls for one opened resource
#[async_trait]
pub trait MediaHandle: Send + Sync {
    /// Start or resume output
    ///
    /// Resolves once the engine confirms playback; rejects when the platform
    /// refuses (autoplay policy) with `PlaybackError::PlaybackRejected`.
    async fn play(&self) -> Result<()>;

    /// Pause output, keeping the current position
    fn pause(&self);

    /// Jump to a position in seconds
    fn seek_to(&self, position: f64);

    /// Current playback position in seconds
    fn position(&self) -> f64;

    /// Set output level in [0, 1]
    fn set_volume(&self, volume: f32);

    /// Current output level
    fn volume(&self) -> f32;

    /// Release the resource
    ///
    /// Must be idempotent. No events are delivered afterwards.
    fn release(&self);
}
