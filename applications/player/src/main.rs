/// StoryVibe Player - headless preview of chapter music
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use storyvibe_core::MusicTrack;
use storyvibe_player::{preview, PlayerSettings, PreviewRequest};
use storyvibe_playback::SessionOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "storyvibe-player")]
#[command(about = "Preview StoryVibe chapter music on a simulated engine", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "STORYVIBE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SessionArgs {
    /// Start playing once loaded
    #[arg(long)]
    autoplay: bool,

    /// Disable the autoplay fade-in
    #[arg(long)]
    no_fade: bool,

    /// Stop at the end of the track instead of looping
    #[arg(long)]
    no_loop: bool,

    /// Initial volume (0.0-1.0)
    #[arg(long)]
    volume: Option<f32>,

    /// Seconds to run before disposing the player
    #[arg(long)]
    run_for: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview a track by URL
    Play {
        /// Media Origin URL
        url: String,

        /// Display title
        #[arg(short, long)]
        title: Option<String>,

        /// Simulated track duration in seconds
        #[arg(short, long)]
        duration: Option<f64>,

        #[command(flatten)]
        session: SessionArgs,
    },
    /// Preview the music attached to a chapter record (JSON)
    Chapter {
        /// Path to the chapter JSON file
        path: PathBuf,

        /// Simulated track duration in seconds
        #[arg(short, long)]
        duration: Option<f64>,

        #[command(flatten)]
        session: SessionArgs,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storyvibe_player=info,storyvibe_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = PlayerSettings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Play {
            url,
            title,
            duration,
            session,
        } => {
            let track = MusicTrack::parse(&url, title.unwrap_or_default())?;
            play(&settings, track, duration, &session).await?;
        }
        Commands::Chapter {
            path,
            duration,
            session,
        } => {
            let Some(track) = preview::load_chapter_track(&path)? else {
                println!("Chapter has no music attached");
                return Ok(());
            };
            play(&settings, track, duration, &session).await?;
        }
        Commands::Config => {
            print!("{}", settings.to_toml()?);
        }
    }

    Ok(())
}

async fn play(
    settings: &PlayerSettings,
    track: MusicTrack,
    duration: Option<f64>,
    args: &SessionArgs,
) -> anyhow::Result<()> {
    let defaults = &settings.session;
    let options = SessionOptions {
        loop_playback: defaults.loop_playback && !args.no_loop,
        fade_enabled: defaults.fade_enabled && !args.no_fade,
        auto_play: defaults.auto_play || args.autoplay,
        initial_volume: args.volume.unwrap_or(defaults.initial_volume),
        show_controls: defaults.show_controls,
        title: None,
    };

    let duration = duration.unwrap_or(settings.preview.track_duration);
    let run_for = args.run_for.unwrap_or(settings.preview.run_for);
    if !(duration.is_finite() && duration > 0.0) || !(run_for.is_finite() && run_for > 0.0) {
        anyhow::bail!("--duration and --run-for must be positive");
    }
    if !(0.0..=1.0).contains(&options.initial_volume) {
        anyhow::bail!("--volume must be between 0 and 1");
    }

    let request = PreviewRequest {
        track,
        options,
        duration,
        run_for: Duration::from_secs_f64(run_for),
    };

    let outcome = preview::run(settings, request).await?;
    println!("{}", preview::summary(&outcome));
    Ok(())
}
