//! StoryVibe Core
//!
//! Platform-agnostic domain records and media track sources for StoryVibe.
//!
//! This crate provides the foundational building blocks shared by the
//! playback library and the player applications.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Records**: `Story`, `Chapter` as stored by the document database
//! - **Track Sources**: `MusicTrack`, a validated Media Origin URL plus display title
//! - **Error Handling**: `CoreError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use storyvibe_core::MusicTrack;
//!
//! let track = MusicTrack::parse("https://media.example.com/rain.mp3", "Rain").unwrap();
//! assert_eq!(track.title, "Rain");
//! assert_eq!(track.url.scheme(), "https");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use types::{parse_source_url, Chapter, MusicTrack, Story, DEFAULT_TRACK_TITLE};
