mod repository;
mod schema;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Item, ItemFilter, ItemSummary, SaveOutcome};

pub use repository::{Repository, IN_MEMORY};
pub use schema::is_valid_table_name;

/// Persistence for items with at-most-once storage per guid and per link.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Open the session and make sure the uniqueness constraints exist. Idempotent.
    async fn connect(&self) -> Result<(), StoreError>;

    /// Insert the item unless its guid or link is already stored.
    async fn save(&self, item: &Item) -> Result<SaveOutcome, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    async fn query(&self, filter: &ItemFilter) -> Result<Vec<ItemSummary>, StoreError>;

    /// Release the session. Calling it again is a no-op.
    async fn close(&self) -> Result<(), StoreError>;
}
