use chrono::{DateTime, Utc};

use crate::models::{Item, Media, RawEntry, RawMedia, RawThumbnail, Thumbnail};

/// Text value of the premium marker that flags an item as premium.
pub const PREMIUM_FLAG: &str = "true";

const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";
const DEFAULT_MEDIUM: &str = "image";

/// Turn a raw entry into an [`Item`], stamping missing publish dates with the current time.
pub fn normalize(entry: RawEntry, feed_url: &str, feed_title: &str) -> Item {
    normalize_at(entry, feed_url, feed_title, Utc::now())
}

/// Same as [`normalize`] with an explicit clock.
///
/// Empty strings count as absent, so every fallback chain moves on to the next field.
pub fn normalize_at(
    entry: RawEntry,
    feed_url: &str,
    feed_title: &str,
    now: DateTime<Utc>,
) -> Item {
    let link = first_present(&[&entry.link]).unwrap_or_default();
    let guid = first_present(&[&entry.guid, &entry.link]).unwrap_or_default();
    let description = first_present(&[&entry.description, &entry.summary]).unwrap_or_default();
    let content = first_present(&[&entry.content_encoded, &entry.content])
        .unwrap_or_else(|| description.clone());
    let author = first_present(&[&entry.creator, &entry.author]).unwrap_or_default();

    let mut media: Vec<Media> = entry.media_content.iter().filter_map(to_media).collect();
    media.extend(entry.media_group.iter().filter_map(to_media));

    Item {
        title: entry.title.unwrap_or_default(),
        link,
        guid,
        published_at: entry.published.unwrap_or(now),
        description,
        content,
        author,
        categories: entry
            .categories
            .into_iter()
            .filter(|c| !c.trim().is_empty())
            .collect(),
        media,
        thumbnail: entry.media_thumbnail.as_ref().and_then(to_thumbnail),
        is_premium: entry.premium.as_deref() == Some(PREMIUM_FLAG),
        feed_title: feed_title.to_string(),
        feed_url: feed_url.to_string(),
    }
}

fn first_present(candidates: &[&Option<String>]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn to_media(raw: &RawMedia) -> Option<Media> {
    let url = raw.url.as_deref().filter(|u| !u.is_empty())?;
    let media_type = raw
        .media_type
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string());
    let medium = raw
        .medium
        .clone()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| medium_of(&media_type).to_string());

    Some(Media {
        url: url.to_string(),
        media_type,
        medium,
        credit: raw.credit.clone().unwrap_or_default(),
    })
}

/// Classify by the top-level MIME type, defaulting to "image".
fn medium_of(media_type: &str) -> &'static str {
    match media_type.split('/').next().map(str::trim) {
        Some("video") => "video",
        Some("audio") => "audio",
        _ => DEFAULT_MEDIUM,
    }
}

fn to_thumbnail(raw: &RawThumbnail) -> Option<Thumbnail> {
    let url = raw.url.as_deref().filter(|u| !u.is_empty())?;
    Some(Thumbnail {
        url: url.to_string(),
        width: raw.width,
        height: raw.height,
    })
}
