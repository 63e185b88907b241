use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The canonical, storage-ready record for one feed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub title: String,
    pub link: String,
    pub guid: String,
    pub published_at: DateTime<Utc>,
    pub description: String,
    pub content: String,
    pub author: String,
    pub categories: Vec<String>,
    pub media: Vec<Media>,
    pub thumbnail: Option<Thumbnail>,
    pub is_premium: bool,
    pub feed_title: String,
    pub feed_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub medium: String,
    #[serde(default)]
    pub credit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// An item as it sits in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredItem {
    pub id: i64,
    pub item: Item,
    pub created_at: DateTime<Utc>,
}

/// Display projection returned by listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub title: String,
    pub description: String,
    pub categories: Vec<String>,
    pub pub_date: DateTime<Utc>,
}

/// Case-insensitive substring filters for listings. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub title: Option<String>,
    pub category: Option<String>,
}

impl ItemFilter {
    /// Builds a filter, treating blank terms as absent.
    pub fn new(title: Option<String>, category: Option<String>) -> Self {
        Self {
            title: non_blank(title),
            category: non_blank(category),
        }
    }
}

fn non_blank(term: Option<String>) -> Option<String> {
    term.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Result of an insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Stored { created_at: DateTime<Utc> },
    Duplicate,
}
