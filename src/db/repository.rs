use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use tokio::sync::RwLock;
use tokio_rusqlite::Connection;

use crate::config::Config;
use crate::error::StoreError;
use crate::models::{Item, ItemFilter, ItemSummary, SaveOutcome, StoredItem};

use super::schema::{is_valid_table_name, items_schema};
use super::ItemStore;

/// Location that keeps the database in memory.
pub const IN_MEMORY: &str = ":memory:";

const ITEM_COLUMNS: &str = "id, guid, link, title, description, content, author, categories, \
     media, thumbnail, is_premium, feed_title, feed_url, published_at, created_at";

/// SQLite-backed [`ItemStore`].
pub struct Repository {
    location: String,
    table: String,
    conn: RwLock<Option<Connection>>,
}

impl Repository {
    pub fn new(location: impl Into<String>, table: impl Into<String>) -> Result<Self, StoreError> {
        let table = table.into();
        if !is_valid_table_name(&table) {
            return Err(StoreError::InvalidCollection(table));
        }

        Ok(Self {
            location: location.into(),
            table,
            conn: RwLock::new(None),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        Self::new(config.database_location(), config.collection_name.clone())
    }

    pub fn in_memory(table: impl Into<String>) -> Result<Self, StoreError> {
        Self::new(IN_MEMORY, table)
    }

    async fn connection(&self) -> Result<Connection, StoreError> {
        self.conn.read().await.clone().ok_or(StoreError::NotConnected)
    }

    pub async fn find_by_guid(&self, guid: &str) -> Result<Option<StoredItem>, StoreError> {
        self.find_one("guid", guid).await
    }

    pub async fn find_by_link(&self, link: &str) -> Result<Option<StoredItem>, StoreError> {
        self.find_one("link", link).await
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<StoredItem>, StoreError> {
        let conn = self.connection().await?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            ITEM_COLUMNS, self.table, column
        );
        let value = value.to_string();

        let item = conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let item = stmt
                    .query_row(params![value], stored_item_from_row)
                    .optional()?;
                Ok(item)
            })
            .await?;
        Ok(item)
    }
}

#[async_trait]
impl ItemStore for Repository {
    async fn connect(&self) -> Result<(), StoreError> {
        let mut guard = self.conn.write().await;

        let conn = match guard.as_ref() {
            Some(conn) => conn.clone(),
            None => {
                if self.location != IN_MEMORY {
                    if let Some(parent) = Path::new(&self.location).parent() {
                        if !parent.as_os_str().is_empty() {
                            std::fs::create_dir_all(parent)?;
                        }
                    }
                }
                Connection::open(&self.location).await?
            }
        };

        let schema = items_schema(&self.table);
        conn.call(move |conn| {
            conn.execute_batch(&schema)?;
            Ok(())
        })
        .await?;

        *guard = Some(conn);
        tracing::info!("Connected to item store {} ({})", self.location, self.table);
        Ok(())
    }

    async fn save(&self, item: &Item) -> Result<SaveOutcome, StoreError> {
        let conn = self.connection().await?;

        let categories = serde_json::to_string(&item.categories)?;
        let media = serde_json::to_string(&item.media)?;
        let thumbnail = item
            .thumbnail
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let created_at = Utc::now().trunc_subsecs(6);

        let sql = format!(
            r#"INSERT INTO {} (guid, link, title, description, content, author, categories,
                               media, thumbnail, is_premium, feed_title, feed_url,
                               published_at, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
               ON CONFLICT DO NOTHING"#,
            self.table
        );
        let item = item.clone();

        let inserted = conn
            .call(move |conn| {
                let inserted = conn.execute(
                    &sql,
                    params![
                        item.guid,
                        item.link,
                        item.title,
                        item.description,
                        item.content,
                        item.author,
                        categories,
                        media,
                        thumbnail,
                        item.is_premium,
                        item.feed_title,
                        item.feed_url,
                        format_datetime(&item.published_at),
                        format_datetime(&created_at),
                    ],
                )?;
                Ok(inserted)
            })
            .await?;

        if inserted == 0 {
            Ok(SaveOutcome::Duplicate)
        } else {
            Ok(SaveOutcome::Stored { created_at })
        }
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let conn = self.connection().await?;
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);

        let count = conn
            .call(move |conn| {
                let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn query(&self, filter: &ItemFilter) -> Result<Vec<ItemSummary>, StoreError> {
        let conn = self.connection().await?;
        let sql = format!(
            r#"SELECT title, description, categories, published_at
               FROM {table}
               WHERE (?1 IS NULL OR instr(lower(title), lower(?1)) > 0)
                 AND (?2 IS NULL OR EXISTS (
                        SELECT 1 FROM json_each({table}.categories)
                        WHERE instr(lower(json_each.value), lower(?2)) > 0))
               ORDER BY published_at DESC, created_at DESC"#,
            table = self.table
        );
        let title = filter.title.clone();
        let category = filter.category.clone();

        let items = conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let items = stmt
                    .query_map(params![title, category], summary_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?;
        Ok(items)
    }

    async fn close(&self) -> Result<(), StoreError> {
        let conn = self.conn.write().await.take();
        if let Some(conn) = conn {
            conn.close().await?;
            tracing::info!("Item store {} closed", self.location);
        }
        Ok(())
    }
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime('now') format
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn datetime_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp {:?}", raw).into(),
        )
    })
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn summary_from_row(row: &Row) -> rusqlite::Result<ItemSummary> {
    Ok(ItemSummary {
        title: row.get(0)?,
        description: row.get(1)?,
        categories: json_column(row, 2)?,
        pub_date: datetime_column(row, 3)?,
    })
}

fn stored_item_from_row(row: &Row) -> rusqlite::Result<StoredItem> {
    let thumbnail = match row.get::<_, Option<String>>(9)? {
        Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e))
        })?),
        None => None,
    };

    Ok(StoredItem {
        id: row.get(0)?,
        item: Item {
            guid: row.get(1)?,
            link: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            content: row.get(5)?,
            author: row.get(6)?,
            categories: json_column(row, 7)?,
            media: json_column(row, 8)?,
            thumbnail,
            is_premium: row.get(10)?,
            feed_title: row.get(11)?,
            feed_url: row.get(12)?,
            published_at: datetime_column(row, 13)?,
        },
        created_at: datetime_column(row, 14)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Media, Thumbnail};

    fn item(guid: &str, link: &str, title: &str) -> Item {
        Item {
            title: title.to_string(),
            link: link.to_string(),
            guid: guid.to_string(),
            published_at: Utc::now().trunc_subsecs(6),
            description: format!("About {}", title),
            content: String::new(),
            author: String::new(),
            categories: vec![],
            media: vec![],
            thumbnail: None,
            is_premium: false,
            feed_title: "Example".to_string(),
            feed_url: "https://example.com/feed".to_string(),
        }
    }

    async fn connected() -> Repository {
        let repo = Repository::in_memory("rss_items").unwrap();
        repo.connect().await.unwrap();
        repo
    }

    #[tokio::test]
    async fn second_save_is_a_duplicate() {
        let repo = connected().await;
        let first = item("g1", "https://example.com/1", "One");

        let outcome = repo.save(&first).await.unwrap();
        let SaveOutcome::Stored { created_at } = outcome else {
            panic!("expected first save to store, got {:?}", outcome);
        };

        assert_eq!(repo.save(&first).await.unwrap(), SaveOutcome::Duplicate);
        assert_eq!(repo.count().await.unwrap(), 1);

        let stored = repo.find_by_guid("g1").await.unwrap().unwrap();
        assert_eq!(stored.created_at, created_at);
        assert_eq!(stored.item, first);
    }

    #[tokio::test]
    async fn guid_and_link_are_independent_keys() {
        let repo = connected().await;
        repo.save(&item("g1", "https://example.com/1", "One"))
            .await
            .unwrap();

        let same_link = item("g2", "https://example.com/1", "Other guid");
        assert_eq!(repo.save(&same_link).await.unwrap(), SaveOutcome::Duplicate);

        let same_guid = item("g1", "https://example.com/2", "Other link");
        assert_eq!(repo.save(&same_guid).await.unwrap(), SaveOutcome::Duplicate);

        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.find_by_link("https://example.com/2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn round_trips_media_and_thumbnail() {
        let repo = connected().await;
        let mut rich = item("g1", "https://example.com/1", "Rich");
        rich.categories = vec!["Space".to_string(), "Science".to_string()];
        rich.media = vec![Media {
            url: "https://img.example.com/1.jpg".to_string(),
            media_type: "image/jpeg".to_string(),
            medium: "image".to_string(),
            credit: String::new(),
        }];
        rich.thumbnail = Some(Thumbnail {
            url: "https://img.example.com/t.jpg".to_string(),
            width: Some(64),
            height: Some(48),
        });
        rich.is_premium = true;

        repo.save(&rich).await.unwrap();
        let stored = repo
            .find_by_link("https://example.com/1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.item, rich);
    }

    #[tokio::test]
    async fn query_filters_case_insensitively() {
        let repo = connected().await;
        let mut launch = item("g1", "https://example.com/1", "Rocket Launch Delayed");
        launch.categories = vec!["Space".to_string()];
        repo.save(&launch).await.unwrap();
        repo.save(&item("g2", "https://example.com/2", "Weather Report"))
            .await
            .unwrap();

        let all = repo.query(&ItemFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let by_title = repo
            .query(&ItemFilter::new(Some("LAUNCH".to_string()), None))
            .await
            .unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].title, "Rocket Launch Delayed");
        assert_eq!(by_title[0].categories, vec!["Space".to_string()]);

        let by_category = repo
            .query(&ItemFilter::new(None, Some("spa".to_string())))
            .await
            .unwrap();
        assert_eq!(by_category.len(), 1);

        let both = repo
            .query(&ItemFilter::new(
                Some("weather".to_string()),
                Some("space".to_string()),
            ))
            .await
            .unwrap();
        assert!(both.is_empty());
    }

    #[tokio::test]
    async fn category_filter_ignores_json_syntax() {
        let repo = connected().await;
        let mut tagged = item("g1", "https://example.com/1", "Tagged");
        tagged.categories = vec!["News".to_string()];
        repo.save(&tagged).await.unwrap();

        let result = repo
            .query(&ItemFilter::new(None, Some("\",\"".to_string())))
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn query_orders_newest_first() {
        let repo = connected().await;
        let mut older = item("g1", "https://example.com/1", "Older");
        older.published_at = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut newer = item("g2", "https://example.com/2", "Newer");
        newer.published_at = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        repo.save(&older).await.unwrap();
        repo.save(&newer).await.unwrap();

        let titles: Vec<String> = repo
            .query(&ItemFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["Newer".to_string(), "Older".to_string()]);
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let repo = connected().await;
        repo.save(&item("g1", "https://example.com/1", "One"))
            .await
            .unwrap();

        repo.connect().await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn operations_fail_before_connect_and_after_close() {
        let repo = Repository::in_memory("rss_items").unwrap();
        assert!(matches!(repo.count().await, Err(StoreError::NotConnected)));

        repo.connect().await.unwrap();
        repo.close().await.unwrap();
        repo.close().await.unwrap();

        assert!(matches!(
            repo.save(&item("g1", "l1", "t")).await,
            Err(StoreError::NotConnected)
        ));
        assert!(matches!(
            repo.query(&ItemFilter::default()).await,
            Err(StoreError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn persists_on_disk_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rss_harvest.db");
        let location = path.to_string_lossy().to_string();

        let repo = Repository::new(location.clone(), "rss_items").unwrap();
        repo.connect().await.unwrap();
        repo.save(&item("g1", "https://example.com/1", "One"))
            .await
            .unwrap();
        repo.close().await.unwrap();

        let reopened = Repository::new(location, "rss_items").unwrap();
        reopened.connect().await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
        assert_eq!(
            reopened
                .save(&item("g1", "https://example.com/1", "One"))
                .await
                .unwrap(),
            SaveOutcome::Duplicate
        );
        reopened.close().await.unwrap();
    }

    #[test]
    fn stored_rows_reject_updates() {
        tokio_test::block_on(async {
            let repo = connected().await;
            repo.save(&item("g1", "https://example.com/1", "One"))
                .await
                .unwrap();

            let conn = repo.connection().await.unwrap();
            let update = conn
                .call(|conn| {
                    conn.execute("UPDATE rss_items SET title = 'Changed' WHERE guid = 'g1'", [])?;
                    Ok(())
                })
                .await;
            tokio_test::assert_err!(update);

            let stored = repo.find_by_guid("g1").await.unwrap().unwrap();
            assert_eq!(stored.item.title, "One");
        });
    }

    #[test]
    fn rejects_unsafe_collection_names() {
        assert!(matches!(
            Repository::in_memory("items; DROP TABLE items"),
            Err(StoreError::InvalidCollection(_))
        ));
    }
}
