/// Chapter domain type
use crate::error::Result;
use crate::types::track::MusicTrack;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chapter of a story, optionally paired with background music
///
/// Field names follow the stored document layout (camelCase, epoch-millisecond
/// timestamps).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// Unique chapter identifier
    pub id: String,

    /// Owning story
    pub story_id: String,

    /// Chapter title
    pub title: String,

    /// Chapter body text
    pub content: String,

    /// Position within the story (1-based)
    pub order: u32,

    /// Background music URL on the Media Origin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_url: Option<String>,

    /// Media Origin asset id (used for out-of-band deletion)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_public_id: Option<String>,

    /// Original file name of the uploaded music
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_filename: Option<String>,

    /// Creation timestamp
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,

    /// Number of reads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_count: Option<u64>,
}

impl Chapter {
    /// Whether this chapter has background music attached
    pub fn has_music(&self) -> bool {
        self.music_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    /// The chapter's music as a playable track
    ///
    /// Returns `Ok(None)` when no music is attached and an error when the
    /// stored URL is not streamable.
    pub fn music_track(&self) -> Result<Option<MusicTrack>> {
        if !self.has_music() {
            return Ok(None);
        }

        let url = self.music_url.as_deref().unwrap_or_default();
        let title = self.music_filename.clone().unwrap_or_default();
        MusicTrack::parse(url, title).map(Some)
    }

    /// Parse a chapter from its JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::track::DEFAULT_TRACK_TITLE;

    fn chapter_json(music: &str) -> String {
        format!(
            r#"{{
                "id": "ch1",
                "storyId": "s1",
                "title": "The Storm",
                "content": "It was a dark night.",
                "order": 1,
                {music}
                "createdAt": 1700000000000,
                "updatedAt": 1700000100000
            }}"#
        )
    }

    #[test]
    fn parses_stored_document() {
        let chapter = Chapter::from_json(&chapter_json(
            r#""musicUrl": "https://cdn.example.com/storm.mp3", "musicFilename": "storm.mp3","#,
        ))
        .unwrap();

        assert_eq!(chapter.story_id, "s1");
        assert_eq!(chapter.created_at.timestamp_millis(), 1_700_000_000_000);
        assert!(chapter.has_music());

        let track = chapter.music_track().unwrap().unwrap();
        assert_eq!(track.title, "storm.mp3");
        assert_eq!(track.url.path(), "/storm.mp3");
    }

    #[test]
    fn chapter_without_music_has_no_track() {
        let chapter = Chapter::from_json(&chapter_json("")).unwrap();
        assert!(!chapter.has_music());
        assert!(chapter.music_track().unwrap().is_none());
    }

    #[test]
    fn blank_music_url_counts_as_none() {
        let chapter = Chapter::from_json(&chapter_json(r#""musicUrl": "  ","#)).unwrap();
        assert!(chapter.music_track().unwrap().is_none());
    }

    #[test]
    fn missing_filename_uses_default_title() {
        let chapter =
            Chapter::from_json(&chapter_json(r#""musicUrl": "https://cdn.example.com/x.mp3","#))
                .unwrap();
        let track = chapter.music_track().unwrap().unwrap();
        assert_eq!(track.title, DEFAULT_TRACK_TITLE);
    }

    #[test]
    fn optional_fields_are_omitted_when_serialized() {
        let chapter = Chapter::from_json(&chapter_json("")).unwrap();
        let json = serde_json::to_string(&chapter).unwrap();
        assert!(!json.contains("musicUrl"));
        assert!(json.contains("\"storyId\":\"s1\""));
    }
}
