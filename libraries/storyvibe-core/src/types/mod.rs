//! Domain types

mod chapter;
mod story;
mod track;

pub use chapter::Chapter;
pub use story::Story;
pub use track::{parse_source_url, MusicTrack, DEFAULT_TRACK_TITLE};
