use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::db::ItemStore;
use crate::error::{AppError, Result};
use crate::feed::FeedSource;

use super::cycle::{run_round, RoundReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Stopped,
    Running,
    /// Terminal.
    Stopping,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerState::Stopped => "stopped",
            SchedulerState::Running => "running",
            SchedulerState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Drives polling rounds over the configured feeds.
///
/// `stopped -> running` on [`Scheduler::start`], `running -> stopping` on
/// [`Scheduler::stop`]. Rounds never overlap, and a stop waits for the round in flight.
pub struct Scheduler {
    source: Arc<dyn FeedSource>,
    store: Arc<dyn ItemStore>,
    feeds: Vec<String>,
    interval: Duration,
    concurrency: usize,
    state: watch::Sender<SchedulerState>,
    last_checked: RwLock<Option<DateTime<Utc>>>,
    last_round: RwLock<Option<RoundReport>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(
        source: Arc<dyn FeedSource>,
        store: Arc<dyn ItemStore>,
        feeds: Vec<String>,
        interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Stopped);
        Self {
            source,
            store,
            feeds,
            interval,
            concurrency: 1,
            state,
            last_checked: RwLock::new(None),
            last_round: RwLock::new(None),
            worker: Mutex::new(None),
        }
    }

    /// Number of feeds fetched at once within a round.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start time of the most recent round.
    pub async fn last_checked(&self) -> Option<DateTime<Utc>> {
        *self.last_checked.read().await
    }

    pub async fn last_round(&self) -> Option<RoundReport> {
        self.last_round.read().await.clone()
    }

    /// Connect the store, run one round, then keep polling on the interval.
    ///
    /// Fails if the store cannot be reached or the scheduler was already started or stopped.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let mut worker = self.worker.lock().await;

        let state = self.state();
        if state != SchedulerState::Stopped {
            return Err(AppError::Scheduler(format!(
                "cannot start a scheduler that is {}",
                state
            )));
        }

        self.store.connect().await?;

        let started = self.state.send_if_modified(|s| {
            if *s == SchedulerState::Stopped {
                *s = SchedulerState::Running;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(AppError::Scheduler(
                "scheduler was stopped while starting".to_string(),
            ));
        }

        tracing::info!(
            "Starting feed harvester: monitoring {} feeds every {} seconds",
            self.feeds.len(),
            self.interval.as_secs_f64()
        );

        self.poll().await;

        let scheduler = Arc::clone(self);
        *worker = Some(tokio::spawn(async move { scheduler.run_timer().await }));
        Ok(())
    }

    /// Stop polling and close the store. Only the first call does anything.
    pub async fn stop(&self) -> Result<()> {
        let stopping = self.state.send_if_modified(|s| {
            if *s == SchedulerState::Stopping {
                false
            } else {
                *s = SchedulerState::Stopping;
                true
            }
        });
        if !stopping {
            return Ok(());
        }

        tracing::info!("Shutting down feed harvester");

        // Waits for `start` to finish its first round, then for the timer task.
        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("Harvest worker ended abnormally: {}", e);
            }
        }

        self.store.close().await?;
        Ok(())
    }

    async fn run_timer(self: Arc<Self>) {
        let mut state = self.state.subscribe();
        let period = self.interval.max(Duration::from_millis(1));
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *state.borrow_and_update() != SchedulerState::Running {
                break;
            }

            tokio::select! {
                _ = timer.tick() => {}
                changed = state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            self.poll().await;
        }

        tracing::debug!("Harvest timer disarmed");
    }

    async fn poll(&self) {
        let started_at = Utc::now();
        *self.last_checked.write().await = Some(started_at);

        tracing::info!("Checking {} feeds", self.feeds.len());
        let report = run_round(
            self.source.as_ref(),
            self.store.as_ref(),
            &self.feeds,
            self.concurrency,
            started_at,
        )
        .await;
        tracing::info!(
            "Feed check complete: {} new items out of {} seen, {} feeds failed",
            report.items_stored(),
            report.items_seen(),
            report.feeds_failed()
        );

        *self.last_round.write().await = Some(report);
    }
}
