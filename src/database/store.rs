use crate::core::error::StoreResult;
use crate::features::reviews::models::{ItemFilter, NewItem, TrackedItem, UserStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Transactional storage for tracked items.
///
/// Every write either fully commits or has no effect. Validation and
/// not-found failures surface as `StoreError::Validation` / `StoreError::NotFound`.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Validate, insert, link tags and bump the owner's stats. Returns the new id.
    async fn create_item(&self, item: &NewItem) -> StoreResult<i64>;

    async fn get_item(&self, id: i64) -> StoreResult<TrackedItem>;

    /// Replace mutable fields and resync the full tag set
    async fn update_item(&self, item: &TrackedItem) -> StoreResult<()>;

    async fn delete_item(&self, id: i64) -> StoreResult<()>;

    /// Items matching every set filter, newest `solved_at` first
    async fn list_items(&self, filter: &ItemFilter) -> StoreResult<Vec<TrackedItem>>;

    /// Every owner with at least one item, in no particular order
    async fn list_distinct_owners(&self) -> StoreResult<Vec<String>>;

    /// Items solved at or before `cutoff` and not reviewed after it, oldest first
    async fn list_due_items(
        &self,
        owner: &str,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<TrackedItem>>;

    /// `review_count += 1` and `last_reviewed_at = now`. Each call counts.
    async fn increment_review_count(&self, id: i64) -> StoreResult<()>;

    /// `None` until the owner creates their first item
    async fn get_user_stats(&self, owner: &str) -> StoreResult<Option<UserStats>>;
}
