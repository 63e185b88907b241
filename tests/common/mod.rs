//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use feed_harvester::error::{FetchError, FetchFailure};
use feed_harvester::feed::{parse_document, FeedSource};
use feed_harvester::models::FetchedFeed;

pub const NEWS_FEED: &str = "https://news.example.com/rss";
pub const BROKEN_FEED: &str = "https://broken.example.com/rss";

pub const NEWS_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:bild="http://www.bild.de/rss">
  <channel>
    <title>Example News</title>
    <link>https://news.example.com/</link>
    <description>All the news</description>
    <item>
      <title>Rocket Launch Delayed</title>
      <link>https://news.example.com/rocket</link>
      <guid>g1</guid>
      <description>Weather scrubs the launch</description>
      <pubDate>Mon, 12 Jan 2026 09:30:00 GMT</pubDate>
      <bild:premium>true</bild:premium>
    </item>
    <item>
      <title>Weather Report</title>
      <link>https://news.example.com/weather</link>
      <guid>g2</guid>
      <category>Weather</category>
      <pubDate>Mon, 12 Jan 2026 08:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

/// Serves feed documents from memory through the real parser.
#[derive(Default)]
pub struct DocumentSource {
    documents: Mutex<HashMap<String, String>>,
    fetches: AtomicUsize,
}

impl DocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, url: &str, document: &str) -> Self {
        self.set_document(url, document);
        self
    }

    pub fn set_document(&self, url: &str, document: &str) {
        self.documents
            .lock()
            .unwrap()
            .insert(url.to_string(), document.to_string());
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for DocumentSource {
    async fn fetch(&self, url: &str) -> Result<FetchedFeed, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let document = self.documents.lock().unwrap().get(url).cloned();
        match document {
            Some(document) => {
                parse_document(document.as_bytes()).map_err(|e| FetchError::new(url, e))
            }
            None => Err(FetchError::new(
                url,
                FetchFailure::Other("connection refused".to_string()),
            )),
        }
    }
}
