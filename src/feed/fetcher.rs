use std::time::Duration;

use async_trait::async_trait;
use feed_rs::model::{Entry, Link, MediaObject, Person};
use feed_rs::parser;
use reqwest::Client;

use crate::error::{AppError, FetchError, FetchFailure, Result};
use crate::models::{FetchedFeed, RawEntry, RawMedia, RawThumbnail};

use super::markup::{self, DocumentMarkup};

/// Largest feed document we are willing to read.
pub const MAX_FEED_SIZE: u64 = 5 * 1024 * 1024;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const TOTAL_TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 5;
const USER_AGENT: &str = "feed-harvester/1.0";
const RSS_CONTACT_NAME: &str = "author";

/// Anything that can turn a feed URL into parsed entries.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedFeed, FetchError>;
}

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TOTAL_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn download(&self, url: &str) -> std::result::Result<Vec<u8>, FetchFailure> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchFailure::Status(response.status()));
        }

        if let Some(size) = response.content_length() {
            if size > MAX_FEED_SIZE {
                return Err(FetchFailure::TooLarge {
                    size,
                    max: MAX_FEED_SIZE,
                });
            }
        }

        let bytes = response.bytes().await?;
        if bytes.len() as u64 > MAX_FEED_SIZE {
            return Err(FetchFailure::TooLarge {
                size: bytes.len() as u64,
                max: MAX_FEED_SIZE,
            });
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl FeedSource for FeedFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedFeed, FetchError> {
        tracing::debug!("Fetching feed: {}", url);

        let bytes = self
            .download(url)
            .await
            .map_err(|e| FetchError::new(url, e))?;
        let feed = parse_document(&bytes).map_err(|e| FetchError::new(url, e))?;

        tracing::debug!("Found {} entries in {}", feed.entries.len(), url);
        Ok(feed)
    }
}

/// Parse an RSS/Atom/JSON feed document into raw entries, in document order.
pub fn parse_document(bytes: &[u8]) -> std::result::Result<FetchedFeed, FetchFailure> {
    // An empty id lets guid-less entries fall back to their link instead of a generated hash.
    let feed = parser::Builder::new()
        .id_generator(|_, _, _| String::new())
        .build()
        .parse(bytes)?;

    let markup = markup::scan(bytes);

    let title = feed.title.map(|t| t.content).unwrap_or_default();
    let entries = feed
        .entries
        .into_iter()
        .map(|entry| raw_entry(entry, &markup))
        .collect();

    Ok(FetchedFeed { title, entries })
}

fn raw_entry(entry: Entry, markup: &DocumentMarkup) -> RawEntry {
    let guid = Some(entry.id).filter(|id| !id.is_empty());
    let link = primary_link(&entry.links);
    let premium = markup.premium_for(guid.as_deref(), link.as_deref());

    let media_group = entry
        .media
        .iter()
        .flat_map(|object| media_contents(object, markup))
        .collect();
    let media_thumbnail = entry.media.iter().find_map(first_thumbnail);

    RawEntry {
        guid,
        link,
        title: entry.title.map(|t| t.content),
        description: entry.summary.map(|s| s.content),
        summary: None,
        content_encoded: entry.content.and_then(|c| c.body),
        content: None,
        creator: creator(&entry.authors),
        author: contact_author(&entry.authors),
        published: entry.published.or(entry.updated),
        categories: entry
            .categories
            .into_iter()
            .map(|c| c.label.unwrap_or(c.term))
            .collect(),
        media_content: None,
        media_group,
        media_thumbnail,
        premium,
    }
}

/// RSS `<author>` comes through as a person literally named "author" with the text as email.
fn is_rss_contact(person: &Person) -> bool {
    person.name == RSS_CONTACT_NAME && person.email.is_some()
}

/// Name of the first `dc:creator` (or Atom author).
fn creator(authors: &[Person]) -> Option<String> {
    authors
        .iter()
        .find(|p| !is_rss_contact(p))
        .map(|p| p.name.trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Text of the RSS `<author>` element, else any email given.
fn contact_author(authors: &[Person]) -> Option<String> {
    authors
        .iter()
        .find(|p| is_rss_contact(p))
        .or_else(|| authors.iter().find(|p| p.email.is_some()))
        .and_then(|p| p.email.clone())
}

/// The `alternate` link, else the first one.
fn primary_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
        .or_else(|| links.first())
        .map(|l| l.href.clone())
}

fn media_contents(object: &MediaObject, markup: &DocumentMarkup) -> Vec<RawMedia> {
    let group_credit = object.credits.first().map(|c| c.entity.clone());
    object
        .content
        .iter()
        .map(|content| {
            let url = content.url.as_ref().map(|u| u.to_string());
            let declared = url
                .as_deref()
                .and_then(|u| markup.media_for(&markup::media_key(u)))
                .cloned()
                .unwrap_or_default();

            RawMedia {
                url,
                media_type: content.content_type.as_ref().map(|m| m.to_string()),
                medium: declared.medium,
                credit: declared.credit.or_else(|| group_credit.clone()),
            }
        })
        .collect()
}

fn first_thumbnail(object: &MediaObject) -> Option<RawThumbnail> {
    object.thumbnails.first().map(|t| RawThumbnail {
        url: Some(t.image.uri.clone()),
        width: t.image.width,
        height: t.image.height,
    })
}
