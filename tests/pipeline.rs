//! End-to-end harvesting through the real parser, normalizer and SQLite store.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{DocumentSource, BROKEN_FEED, NEWS_FEED, NEWS_RSS};
use feed_harvester::db::{ItemStore, Repository};
use feed_harvester::harvest::{harvest_feed, HarvestTally, Scheduler, SchedulerState};

async fn connected_store() -> Arc<Repository> {
    let store = Arc::new(Repository::in_memory("rss_items").unwrap());
    store.connect().await.unwrap();
    store
}

#[tokio::test]
async fn repeated_rounds_store_each_item_once() {
    let source = DocumentSource::new().with_document(NEWS_FEED, NEWS_RSS);
    let store = connected_store().await;

    let first = harvest_feed(&source, store.as_ref(), NEWS_FEED).await;
    assert_eq!(
        first.tally,
        HarvestTally {
            total: 2,
            stored: 2,
            failed: 0
        }
    );
    let created_at = store.find_by_guid("g1").await.unwrap().unwrap().created_at;

    let second = harvest_feed(&source, store.as_ref(), NEWS_FEED).await;
    assert_eq!(
        second.tally,
        HarvestTally {
            total: 2,
            stored: 0,
            failed: 0
        }
    );
    assert_eq!(store.count().await.unwrap(), 2);
    assert_eq!(
        store.find_by_guid("g1").await.unwrap().unwrap().created_at,
        created_at
    );
}

#[tokio::test]
async fn parsed_items_are_normalized() {
    let source = DocumentSource::new().with_document(NEWS_FEED, NEWS_RSS);
    let store = connected_store().await;

    harvest_feed(&source, store.as_ref(), NEWS_FEED).await;

    let rocket = store.find_by_guid("g1").await.unwrap().unwrap().item;
    assert_eq!(rocket.title, "Rocket Launch Delayed");
    assert_eq!(rocket.link, "https://news.example.com/rocket");
    assert_eq!(rocket.description, "Weather scrubs the launch");
    assert_eq!(rocket.content, "Weather scrubs the launch");
    assert_eq!(rocket.author, "");
    assert!(rocket.is_premium);
    assert_eq!(rocket.feed_title, "Example News");
    assert_eq!(rocket.feed_url, NEWS_FEED);

    let weather = store.find_by_guid("g2").await.unwrap().unwrap().item;
    assert!(!weather.is_premium);
    assert_eq!(weather.categories, vec!["Weather".to_string()]);
}

#[tokio::test]
async fn entries_without_guid_are_keyed_by_link() {
    let document = NEWS_RSS.replace("<guid>g2</guid>", "");
    let source = DocumentSource::new().with_document(NEWS_FEED, &document);
    let store = connected_store().await;

    harvest_feed(&source, store.as_ref(), NEWS_FEED).await;

    let weather = store
        .find_by_link("https://news.example.com/weather")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(weather.item.guid, "https://news.example.com/weather");
}

#[tokio::test]
async fn renamed_guid_with_same_link_is_not_stored_again() {
    let source = DocumentSource::new().with_document(NEWS_FEED, NEWS_RSS);
    let store = connected_store().await;
    harvest_feed(&source, store.as_ref(), NEWS_FEED).await;

    source.set_document(NEWS_FEED, &NEWS_RSS.replace("<guid>g1</guid>", "<guid>g1-v2</guid>"));
    let report = harvest_feed(&source, store.as_ref(), NEWS_FEED).await;

    assert_eq!(report.tally.stored, 0);
    assert_eq!(store.count().await.unwrap(), 2);
    assert!(store.find_by_guid("g1-v2").await.unwrap().is_none());
}

#[tokio::test]
async fn scheduler_isolates_failing_feed() {
    let source = Arc::new(DocumentSource::new().with_document(NEWS_FEED, NEWS_RSS));
    let store = Arc::new(Repository::in_memory("rss_items").unwrap());
    let scheduler = Arc::new(Scheduler::new(
        source.clone(),
        store.clone(),
        vec![BROKEN_FEED.to_string(), NEWS_FEED.to_string()],
        Duration::from_secs(3600),
    ));

    scheduler.start().await.unwrap();

    let round = scheduler.last_round().await.unwrap();
    assert_eq!(round.feeds.len(), 2);
    assert_eq!(round.feeds[0].url, BROKEN_FEED);
    assert_eq!(round.feeds[0].tally, HarvestTally::default());
    assert!(round.feeds[0].is_failed());
    assert_eq!(round.feeds[1].tally.stored, 2);
    assert_eq!(store.count().await.unwrap(), 2);

    scheduler.stop().await.unwrap();
    assert_eq!(scheduler.state(), SchedulerState::Stopping);
}

#[tokio::test]
async fn new_entries_appear_on_later_rounds() {
    let source = Arc::new(DocumentSource::new().with_document(NEWS_FEED, NEWS_RSS));
    let store = Arc::new(Repository::in_memory("rss_items").unwrap());
    let scheduler = Arc::new(Scheduler::new(
        source.clone(),
        store.clone(),
        vec![NEWS_FEED.to_string()],
        Duration::from_millis(50),
    ));

    scheduler.start().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 2);

    let extra_item = r#"<item>
      <title>Launch Window Reopens</title>
      <link>https://news.example.com/window</link>
      <guid>g3</guid>
    </item>
  </channel>"#;
    source.set_document(NEWS_FEED, &NEWS_RSS.replace("</channel>", extra_item));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(store.count().await.unwrap(), 3);

    scheduler.stop().await.unwrap();
}
