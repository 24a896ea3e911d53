/// Core error types for StoryVibe
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for StoryVibe
#[derive(Error, Debug)]
pub enum CoreError {
    /// Media URL could not be parsed
    #[error("Invalid media URL {url:?}: {source}")]
    InvalidUrl {
        /// The rejected input
        url: String,
        /// Underlying parse failure
        #[source]
        source: url::ParseError,
    },

    /// Media URL uses a scheme the player cannot stream from
    #[error("Unsupported media URL scheme: {0}")]
    UnsupportedScheme(String),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
