//! StoryVibe Player Library
//!
//! Headless chapter music player: settings, preview runner and error types.
//!
//! This library exposes the core components for testing purposes.

pub mod config;
pub mod error;
pub mod preview;

// Re-export commonly used types for convenience
pub use config::{PlayerSettings, PreviewSettings};
pub use error::{PlayerError, Result};
pub use preview::{PreviewOutcome, PreviewRequest};
