use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::db::ItemStore;
use crate::feed::{normalize, FeedSource};
use crate::models::SaveOutcome;

/// Per-feed counters for one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestTally {
    /// Entries the feed returned.
    pub total: usize,
    /// Entries stored for the first time.
    pub stored: usize,
    /// Entries skipped because the store failed.
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedReport {
    pub url: String,
    pub feed_title: String,
    pub tally: HarvestTally,
    /// Set when the feed could not be fetched this round.
    pub error: Option<String>,
}

impl FeedReport {
    fn fetch_failed(url: &str, error: String) -> Self {
        Self {
            url: url.to_string(),
            feed_title: String::new(),
            tally: HarvestTally::default(),
            error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Outcome of one pass over every configured feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub feeds: Vec<FeedReport>,
}

impl RoundReport {
    pub fn items_seen(&self) -> usize {
        self.feeds.iter().map(|f| f.tally.total).sum()
    }

    pub fn items_stored(&self) -> usize {
        self.feeds.iter().map(|f| f.tally.stored).sum()
    }

    pub fn feeds_failed(&self) -> usize {
        self.feeds.iter().filter(|f| f.is_failed()).count()
    }
}

/// Fetch one feed and store every entry not seen before.
///
/// Never fails: a fetch error yields a zero tally and a store error skips only that item.
pub async fn harvest_feed(source: &dyn FeedSource, store: &dyn ItemStore, url: &str) -> FeedReport {
    let fetched = match source.fetch(url).await {
        Ok(fetched) => fetched,
        Err(e) => {
            tracing::warn!("Error processing feed {}: {}", url, e);
            return FeedReport::fetch_failed(url, e.to_string());
        }
    };

    let mut tally = HarvestTally::default();
    for entry in fetched.entries {
        tally.total += 1;
        let item = normalize(entry, url, &fetched.title);

        match store.save(&item).await {
            Ok(SaveOutcome::Stored { .. }) => {
                tally.stored += 1;
                tracing::debug!("Saved new item: {}", item.title);
            }
            Ok(SaveOutcome::Duplicate) => {
                tracing::trace!("Item already exists: {}", item.title);
            }
            Err(e) => {
                tally.failed += 1;
                tracing::error!("Failed to store item {} from {}: {}", item.link, url, e);
            }
        }
    }

    tracing::info!(
        "{}: {} new items saved out of {} total",
        url,
        tally.stored,
        tally.total
    );

    FeedReport {
        url: url.to_string(),
        feed_title: fetched.title,
        tally,
        error: None,
    }
}

/// Harvest every feed, at most `concurrency` at a time. Reports keep the order of `feeds`.
pub async fn run_round(
    source: &dyn FeedSource,
    store: &dyn ItemStore,
    feeds: &[String],
    concurrency: usize,
    started_at: DateTime<Utc>,
) -> RoundReport {
    let harvests: Vec<_> = feeds
        .iter()
        .map(|url| harvest_feed(source, store, url))
        .collect();
    let reports: Vec<FeedReport> = stream::iter(harvests)
        .buffered(concurrency.max(1))
        .collect()
        .await;

    RoundReport {
        started_at,
        finished_at: Utc::now(),
        feeds: reports,
    }
}
