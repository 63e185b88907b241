mod cycle;
mod scheduler;

pub use cycle::{harvest_feed, run_round, FeedReport, HarvestTally, RoundReport};
pub use scheduler::{Scheduler, SchedulerState};
