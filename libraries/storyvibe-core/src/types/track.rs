/// Music track source types
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Title shown by the player when a chapter has no music filename
pub const DEFAULT_TRACK_TITLE: &str = "Chapter Music";

/// Schemes the Media Origin serves tracks over
const SUPPORTED_SCHEMES: [&str; 3] = ["http", "https", "file"];

/// A playable music track
///
/// Pairs a validated Media Origin URL with the title displayed by the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicTrack {
    /// Stable URL of the audio asset
    pub url: Url,

    /// Display title
    pub title: String,
}

impl MusicTrack {
    /// Parse and validate a track URL
    ///
    /// A blank title falls back to [`DEFAULT_TRACK_TITLE`].
    pub fn parse(url: &str, title: impl Into<String>) -> Result<Self> {
        let url = parse_source_url(url)?;
        let title = title.into();
        let title = if title.trim().is_empty() {
            DEFAULT_TRACK_TITLE.to_string()
        } else {
            title
        };

        Ok(Self { url, title })
    }
}

/// Parse a Media Origin URL, rejecting schemes the player cannot stream
pub fn parse_source_url(input: &str) -> Result<Url> {
    let url = Url::parse(input.trim()).map_err(|source| CoreError::InvalidUrl {
        url: input.to_string(),
        source,
    })?;

    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(CoreError::UnsupportedScheme(url.scheme().to_string()));
    }

    Ok(url)
}
