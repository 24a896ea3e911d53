/// Headless preview of a track on the simulated engine
use crate::config::PlayerSettings;
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use storyvibe_core::{Chapter, MusicTrack};
use storyvibe_playback::{
    display::{PlayerView, FAILED_MESSAGE},
    PlaybackController, PlaybackSnapshot, PlaybackState, SessionOptions, SimulatedBackend,
    SimulatedTrack,
};

/// What to preview and for how long
#[derive(Debug, Clone)]
pub struct PreviewRequest {
    pub track: MusicTrack,
    pub options: SessionOptions,
    /// Simulated duration in seconds
    pub duration: f64,
    /// Wall time before the player is disposed
    pub run_for: Duration,
}

/// How a preview finished
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewOutcome {
    pub final_state: PlaybackState,
    pub position: f64,
    pub volume: f32,
}

/// Read a chapter record and return its attached music, if any
pub fn load_chapter_track(path: &Path) -> Result<Option<MusicTrack>> {
    let json = std::fs::read_to_string(path)?;
    let chapter = Chapter::from_json(&json)?;
    tracing::info!("Chapter {}: {}", chapter.order, chapter.title);
    Ok(chapter.music_track()?)
}

/// Load the track, press play once it is ready (unless it autoplays), and log
/// every snapshot change until the track ends, fails, or `run_for` elapses
pub async fn run(settings: &PlayerSettings, request: PreviewRequest) -> Result<PreviewOutcome> {
    let latency = Duration::from_millis(settings.preview.load_latency_ms);
    let backend = SimulatedBackend::new().with_track(
        request.track.url.as_str(),
        SimulatedTrack::new(request.duration).with_latency(latency),
    );

    let controller = PlaybackController::with_config(Arc::new(backend), settings.playback.clone())?;
    let mut updates = controller.subscribe();

    let options = request.options.with_title(request.track.title.clone());
    let auto_play = options.auto_play;
    controller.load(request.track.url.as_str(), options)?;
    tracing::info!("Previewing '{}' from {}", request.track.title, request.track.url);

    let deadline = tokio::time::sleep(request.run_for);
    tokio::pin!(deadline);

    let mut last_state = PlaybackState::Idle;
    let mut last_second = u64::MAX;

    loop {
        let snapshot = updates.borrow_and_update().clone();

        if snapshot.state != last_state {
            log_transition(&snapshot);
            last_state = snapshot.state;

            if snapshot.state == PlaybackState::Ready && !auto_play {
                controller.play().await?;
                continue;
            }
        }

        // One progress line per displayed second
        let second = snapshot.position.floor() as u64;
        if snapshot.state == PlaybackState::Playing && second != last_second {
            last_second = second;
            log_progress(&snapshot);
        }

        if matches!(snapshot.state, PlaybackState::Ended | PlaybackState::Failed) {
            break;
        }

        tokio::select! {
            () = &mut deadline => {
                tracing::info!("Preview time elapsed");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    let snapshot = controller.snapshot();
    controller.dispose();

    Ok(PreviewOutcome {
        final_state: snapshot.state,
        position: snapshot.position,
        volume: snapshot.volume,
    })
}

fn log_transition(snapshot: &PlaybackSnapshot) {
    match PlayerView::from_snapshot(snapshot) {
        PlayerView::Hidden => {}
        PlayerView::Loading { message } => tracing::info!("{}", message),
        PlayerView::Failed { message } => tracing::error!("{}", message),
        PlayerView::Controls(view) => tracing::info!(
            state = ?snapshot.state,
            volume = view.volume_slider,
            "{} [{}]",
            view.title,
            view.time_label
        ),
    }
}

fn log_progress(snapshot: &PlaybackSnapshot) {
    if let PlayerView::Controls(view) = PlayerView::from_snapshot(snapshot) {
        tracing::debug!(volume = view.volume_slider, "{}", view.time_label);
    }
}

/// Message shown to the user for a finished preview
pub fn summary(outcome: &PreviewOutcome) -> String {
    match outcome.final_state {
        PlaybackState::Failed => FAILED_MESSAGE.to_string(),
        state => format!(
            "{:?} at {} (volume {:.2})",
            state,
            storyvibe_playback::display::format_time(outcome.position),
            outcome.volume
        ),
    }
}
