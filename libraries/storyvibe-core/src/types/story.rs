/// Story domain type
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published or draft story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    /// Unique story identifier
    pub id: String,

    /// Story title
    pub title: String,

    /// Short description shown on story cards
    pub description: String,

    /// Author user id
    pub author_id: String,

    /// Author display name
    pub author_name: String,

    /// Cover image URL
    pub cover_image: String,

    /// Media Origin asset id of the cover image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_public_id: Option<String>,

    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Whether readers can see the story
    pub published: bool,

    /// Creation timestamp
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,

    /// Number of chapters
    pub chapter_count: u32,

    /// Total reads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_count: Option<u64>,

    /// Distinct readers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_readers: Option<u64>,
}

impl Story {
    /// Whether reading views may mount for this story
    pub fn is_readable(&self) -> bool {
        self.published && self.chapter_count > 0
    }
}
