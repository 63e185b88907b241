use chrono::{DateTime, Utc};

/// One feed document as returned by a fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchedFeed {
    pub title: String,
    pub entries: Vec<RawEntry>,
}

/// An entry as the parser saw it, before any fallbacks are applied.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    pub guid: Option<String>,
    pub link: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    /// `content:encoded` or an equivalent extended body.
    pub content_encoded: Option<String>,
    pub content: Option<String>,
    pub creator: Option<String>,
    pub author: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
    pub media_content: Option<RawMedia>,
    pub media_group: Vec<RawMedia>,
    pub media_thumbnail: Option<RawThumbnail>,
    /// Raw text of the `bild:premium` marker.
    pub premium: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawMedia {
    pub url: Option<String>,
    pub media_type: Option<String>,
    pub medium: Option<String>,
    pub credit: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawThumbnail {
    pub url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}
