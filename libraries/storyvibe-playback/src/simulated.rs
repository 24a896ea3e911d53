//! Simulated media engine
//!
//! A headless engine whose playback position advances with the Tokio clock.
//! Each registered URL has a duration, a load latency, and optionally a load
//! failure; the backend can also refuse a number of `play` calls to mimic a
//! platform autoplay policy. With a paused Tokio clock (`test-util`) the whole
//! engine is deterministic.

use crate::{
    engine::{MediaBackend, MediaEvent, MediaHandle, MediaResource},
    error::{PlaybackError, Result},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

/// Positions within this distance of the end count as finished
const END_EPSILON: f64 = 1e-6;

/// A track known to the simulated origin
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedTrack {
    /// Duration in seconds
    pub duration: f64,

    /// Time between `open` and the metadata (or error) event
    pub load_latency: Duration,

    /// Error reported instead of metadata
    pub failure: Option<String>,
}

impl SimulatedTrack {
    /// Track that loads successfully after 50ms
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            load_latency: Duration::from_millis(50),
            failure: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.load_latency = latency;
        self
    }

    /// Track whose fetch fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            duration: 0.0,
            load_latency: Duration::from_millis(50),
            failure: Some(message.into()),
        }
    }
}

/// Backend serving [`SimulatedTrack`]s by URL
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    tracks: Mutex<HashMap<String, SimulatedTrack>>,
    rejections: Arc<AtomicUsize>,
    opened: Mutex<Vec<Arc<SimulatedHandle>>>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a track (builder form)
    pub fn with_track(self, url: impl Into<String>, track: SimulatedTrack) -> Self {
        self.add_track(url, track);
        self
    }

    /// Register or replace a track
    pub fn add_track(&self, url: impl Into<String>, track: SimulatedTrack) {
        let url = url.into();
        // Store under the normalized form so lookups match `Url::as_str`
        let key = Url::parse(&url).map_or(url, String::from);
        lock(&self.tracks).insert(key, track);
    }

    /// Refuse the next `count` play calls across all handles
    pub fn reject_next_plays(&self, count: usize) {
        self.rejections.store(count, Ordering::SeqCst);
    }

    /// Handle returned by the most recent `open`
    pub fn last_handle(&self) -> Option<Arc<SimulatedHandle>> {
        lock(&self.opened).last().cloned()
    }

    /// Number of resources opened so far
    pub fn open_count(&self) -> usize {
        lock(&self.opened).len()
    }
}

impl MediaBackend for SimulatedBackend {
    fn open(&self, url: &Url, looping: bool) -> Result<MediaResource> {
        let (tx, rx) = mpsc::unbounded_channel();
        let track = lock(&self.tracks).get(url.as_str()).cloned();
        let handle = SimulatedHandle::new(looping, tx, Arc::clone(&self.rejections));

        let latency = track
            .as_ref()
            .map_or(Duration::from_millis(50), |t| t.load_latency);
        let loader = Arc::downgrade(&handle);
        let url = url.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            let Some(handle) = loader.upgrade() else {
                return;
            };

            match track {
                Some(SimulatedTrack {
                    failure: Some(message),
                    ..
                }) => handle.emit(MediaEvent::Error { message }),
                Some(track) => handle.finish_loading(track.duration),
                None => handle.emit(MediaEvent::Error {
                    message: format!("404 Not Found: {url}"),
                }),
            }
        });

        lock(&self.opened).push(Arc::clone(&handle));

        Ok(MediaResource {
            handle,
            events: rx,
        })
    }
}

#[derive(Debug)]
struct EngineState {
    duration: f64,
    looping: bool,
    loaded: bool,
    released: bool,
    playing: bool,
    volume: f32,

    /// Position at `anchor_time`
    anchor_position: f64,
    anchor_time: Instant,

    /// Bumped on every pause/seek/release to retire stale end watchers
    generation: u64,
}

impl EngineState {
    fn position_at(&self, now: Instant) -> f64 {
        if !self.playing {
            return self.anchor_position;
        }

        let position = self.anchor_position + (now - self.anchor_time).as_secs_f64();
        if self.duration <= 0.0 {
            position
        } else if self.looping {
            // Exactly at the end reads as the end until the watcher wraps it
            if position > self.duration {
                position % self.duration
            } else {
                position
            }
        } else {
            position.min(self.duration)
        }
    }

    fn reanchor(&mut self, position: f64, now: Instant) {
        self.anchor_position = position;
        self.anchor_time = now;
        self.generation += 1;
    }
}

/// Transport handle of the simulated engine
#[derive(Debug)]
pub struct SimulatedHandle {
    state: Mutex<EngineState>,
    events: mpsc::UnboundedSender<MediaEvent>,
    rejections: Arc<AtomicUsize>,
    this: Weak<SimulatedHandle>,
}

impl SimulatedHandle {
    fn new(
        looping: bool,
        events: mpsc::UnboundedSender<MediaEvent>,
        rejections: Arc<AtomicUsize>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            state: Mutex::new(EngineState {
                duration: 0.0,
                looping,
                loaded: false,
                released: false,
                playing: false,
                volume: 1.0,
                anchor_position: 0.0,
                anchor_time: Instant::now(),
                generation: 0,
            }),
            events,
            rejections,
            this: this.clone(),
        })
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.state).playing
    }

    pub fn is_released(&self) -> bool {
        lock(&self.state).released
    }

    fn finish_loading(&self, duration: f64) {
        {
            let mut state = lock(&self.state);
            if state.released {
                return;
            }
            state.loaded = true;
            state.duration = duration;
        }
        self.emit(MediaEvent::MetadataLoaded { duration });
    }

    fn emit(&self, event: MediaEvent) {
        if lock(&self.state).released {
            return;
        }
        // Receiver gone means the session detached its listeners
        let _ = self.events.send(event);
    }

    fn spawn_end_watcher(&self, generation: u64) {
        let Some(handle) = self.this.upgrade() else {
            return;
        };
        tokio::spawn(async move { handle.watch_for_end(generation).await });
    }

    async fn watch_for_end(self: Arc<Self>, generation: u64) {
        loop {
            let remaining = {
                let state = lock(&self.state);
                if state.generation != generation || !state.playing || state.duration <= 0.0 {
                    return;
                }
                let elapsed = state.anchor_position + (Instant::now() - state.anchor_time).as_secs_f64();
                (state.duration - elapsed).max(0.0)
            };

            tokio::time::sleep(Duration::from_secs_f64(remaining)).await;

            let ended = {
                let mut state = lock(&self.state);
                if state.generation != generation || !state.playing {
                    return;
                }

                let now = Instant::now();
                let elapsed = state.anchor_position + (now - state.anchor_time).as_secs_f64();
                if elapsed + END_EPSILON < state.duration {
                    continue;
                }

                if state.looping {
                    // Native loop: restart without raising `Ended`
                    state.anchor_position = 0.0;
                    state.anchor_time = now;
                    false
                } else {
                    state.playing = false;
                    state.anchor_position = state.duration;
                    state.generation += 1;
                    true
                }
            };

            if ended {
                debug!("Simulated track reached its end");
                self.emit(MediaEvent::Ended);
                return;
            }
        }
    }
}

#[async_trait]
impl MediaHandle for SimulatedHandle {
    async fn play(&self) -> Result<()> {
        let generation = {
            let mut state = lock(&self.state);
            if state.released {
                return Err(PlaybackError::PlaybackRejected(
                    "resource released".to_string(),
                ));
            }
            if !state.loaded {
                return Err(PlaybackError::PlaybackRejected(
                    "resource not ready".to_string(),
                ));
            }

            let refused = self
                .rejections
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if refused {
                return Err(PlaybackError::PlaybackRejected(
                    "play() is not allowed without a user gesture".to_string(),
                ));
            }

            if state.playing {
                return Ok(());
            }

            let now = Instant::now();
            let start = if !state.looping && state.anchor_position >= state.duration {
                0.0
            } else {
                state.anchor_position
            };
            state.playing = true;
            state.reanchor(start, now);
            state.generation
        };

        self.spawn_end_watcher(generation);
        Ok(())
    }

    fn pause(&self) {
        let mut state = lock(&self.state);
        if state.playing {
            let now = Instant::now();
            let position = state.position_at(now);
            state.playing = false;
            state.reanchor(position, now);
        }
    }

    fn seek_to(&self, position: f64) {
        let generation = {
            let mut state = lock(&self.state);
            if state.released {
                return;
            }

            let mut target = position.max(0.0);
            if state.duration > 0.0 {
                target = target.min(state.duration);
            }
            state.reanchor(target, Instant::now());
            state.playing.then_some(state.generation)
        };

        if let Some(generation) = generation {
            self.spawn_end_watcher(generation);
        }
    }

    fn position(&self) -> f64 {
        lock(&self.state).position_at(Instant::now())
    }

    fn set_volume(&self, volume: f32) {
        lock(&self.state).volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        lock(&self.state).volume
    }

    fn release(&self) {
        let mut state = lock(&self.state);
        if !state.released {
            let now = Instant::now();
            let position = state.position_at(now);
            state.released = true;
            state.playing = false;
            state.reanchor(position, now);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://cdn.example.com/track.mp3";

    fn url() -> Url {
        Url::parse(URL).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn metadata_arrives_after_latency() {
        let backend = SimulatedBackend::new().with_track(
            URL,
            SimulatedTrack::new(30.0).with_latency(Duration::from_millis(200)),
        );
        let mut resource = backend.open(&url(), false).unwrap();

        assert!(resource.events.try_recv().is_err());
        let event = resource.events.recv().await.unwrap();
        assert_eq!(event, MediaEvent::MetadataLoaded { duration: 30.0 });
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_url_reports_error() {
        let backend = SimulatedBackend::new();
        let mut resource = backend.open(&url(), false).unwrap();

        let event = resource.events.recv().await.unwrap();
        assert!(matches!(event, MediaEvent::Error { message } if message.contains("404")));
    }

    #[tokio::test(start_paused = true)]
    async fn position_follows_clock_and_pause() {
        let backend = SimulatedBackend::new().with_track(URL, SimulatedTrack::new(30.0));
        let mut resource = backend.open(&url(), false).unwrap();
        resource.events.recv().await.unwrap();

        resource.handle.play().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!((resource.handle.position() - 2.0).abs() < 1e-6);

        resource.handle.pause();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!((resource.handle.position() - 2.0).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn non_looping_track_emits_ended() {
        let backend = SimulatedBackend::new().with_track(URL, SimulatedTrack::new(3.0));
        let mut resource = backend.open(&url(), false).unwrap();
        resource.events.recv().await.unwrap();

        resource.handle.play().await.unwrap();
        let event = resource.events.recv().await.unwrap();
        assert_eq!(event, MediaEvent::Ended);
        assert!((resource.handle.position() - 3.0).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn looping_track_wraps_silently() {
        let backend = SimulatedBackend::new().with_track(URL, SimulatedTrack::new(3.0));
        let mut resource = backend.open(&url(), true).unwrap();
        resource.events.recv().await.unwrap();

        resource.handle.play().await.unwrap();
        tokio::time::sleep(Duration::from_millis(4500)).await;

        assert!((resource.handle.position() - 1.5).abs() < 1e-3);
        assert!(resource.events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn looping_track_reads_end_after_seek_to_end() {
        let backend = SimulatedBackend::new().with_track(URL, SimulatedTrack::new(120.0));
        let mut resource = backend.open(&url(), true).unwrap();
        resource.events.recv().await.unwrap();

        resource.handle.play().await.unwrap();
        resource.handle.seek_to(120.0);
        assert_eq!(resource.handle.position(), 120.0);

        resource.handle.pause();
        assert_eq!(resource.handle.position(), 120.0);
    }

    #[tokio::test(start_paused = true)]
    async fn rejections_are_consumed() {
        let backend = SimulatedBackend::new().with_track(URL, SimulatedTrack::new(3.0));
        let mut resource = backend.open(&url(), false).unwrap();
        resource.events.recv().await.unwrap();

        backend.reject_next_plays(1);
        assert!(matches!(
            resource.handle.play().await,
            Err(PlaybackError::PlaybackRejected(_))
        ));
        assert!(resource.handle.play().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn released_handle_is_silent() {
        let backend = SimulatedBackend::new().with_track(URL, SimulatedTrack::new(3.0));
        let mut resource = backend.open(&url(), false).unwrap();
        resource.handle.release();
        resource.handle.release();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(resource.events.try_recv().is_err());
        assert!(resource.handle.play().await.is_err());
        assert_eq!(backend.open_count(), 1);
    }
}
