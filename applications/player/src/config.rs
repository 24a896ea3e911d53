/// Player configuration
use crate::error::{PlayerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storyvibe_playback::{PlaybackConfig, SessionOptions};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "storyvibe.toml";

const ENV_PREFIX: &str = "STORYVIBE";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PlayerSettings {
    /// Controller tuning (fade cadence, delays, skip step)
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Defaults for every previewed session
    #[serde(default)]
    pub session: SessionOptions,

    #[serde(default)]
    pub preview: PreviewSettings,
}

/// Simulated engine used by the preview commands
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PreviewSettings {
    /// Track duration assumed when none is given, in seconds
    #[serde(default = "default_track_duration")]
    pub track_duration: f64,

    /// Delay before the simulated metadata arrives, in milliseconds
    #[serde(default = "default_load_latency_ms")]
    pub load_latency_ms: u64,

    /// How long a preview runs before the player is disposed, in seconds
    #[serde(default = "default_run_for")]
    pub run_for: f64,
}

impl PlayerSettings {
    /// Load settings from `path` (or `storyvibe.toml` if present) and the
    /// `STORYVIBE_*` environment
    ///
    /// Nested keys use a double underscore: `STORYVIBE_PLAYBACK__FADE_STEP`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(PlayerError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: PlayerSettings = settings.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.playback.validate()?;

        let volume = self.session.initial_volume;
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlayerError::Config(format!(
                "session.initial_volume must be in [0, 1], got {volume}"
            )));
        }

        if !(self.preview.track_duration.is_finite() && self.preview.track_duration > 0.0) {
            return Err(PlayerError::Config(format!(
                "preview.track_duration must be positive, got {}",
                self.preview.track_duration
            )));
        }

        if !(self.preview.run_for.is_finite() && self.preview.run_for > 0.0) {
            return Err(PlayerError::Config(format!(
                "preview.run_for must be positive, got {}",
                self.preview.run_for
            )));
        }

        Ok(())
    }

    /// Effective settings rendered as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PlayerError::Config(e.to_string()))
    }
}

// Default values
fn default_track_duration() -> f64 {
    180.0
}

fn default_load_latency_ms() -> u64 {
    300
}

fn default_run_for() -> f64 {
    30.0
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            track_duration: default_track_duration(),
            load_latency_ms: default_load_latency_ms(),
            run_for: default_run_for(),
        }
    }
}
