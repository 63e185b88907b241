use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::ItemStore;
use crate::error::StoreError;
use crate::harvest::{RoundReport, Scheduler};
use crate::models::{ItemFilter, ItemSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthView {
    pub status: Liveness,
    pub feeds: usize,
    pub interval_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    #[serde(flatten)]
    pub health: HealthView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
    pub items_stored: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_round: Option<RoundSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    pub finished_at: DateTime<Utc>,
    pub feeds_failed: usize,
    pub items_seen: usize,
    pub items_stored: usize,
}

impl From<&RoundReport> for RoundSummary {
    fn from(report: &RoundReport) -> Self {
        Self {
            finished_at: report.finished_at,
            feeds_failed: report.feeds_failed(),
            items_seen: report.items_seen(),
            items_stored: report.items_stored(),
        }
    }
}

/// Views over scheduler state and the store. Only ever reads.
pub struct StatusService {
    scheduler: Arc<Scheduler>,
    store: Arc<dyn ItemStore>,
}

impl StatusService {
    pub fn new(scheduler: Arc<Scheduler>, store: Arc<dyn ItemStore>) -> Self {
        Self { scheduler, store }
    }

    pub fn health(&self) -> HealthView {
        HealthView {
            status: if self.scheduler.is_running() {
                Liveness::Running
            } else {
                Liveness::Stopped
            },
            feeds: self.scheduler.feeds().len(),
            interval_seconds: self.scheduler.interval().as_secs_f64(),
        }
    }

    /// Health plus last-checked time and a fresh item count.
    pub async fn status(&self) -> Result<StatusView, StoreError> {
        let items_stored = self.store.count().await?;
        let last_round = self.scheduler.last_round().await;

        Ok(StatusView {
            health: self.health(),
            last_checked_at: self.scheduler.last_checked().await,
            items_stored,
            last_round: last_round.as_ref().map(RoundSummary::from),
        })
    }

    pub async fn titles(&self, filter: &ItemFilter) -> Result<Vec<ItemSummary>, StoreError> {
        self.store.query(filter).await
    }
}
