//! # Review-Due Selector
//!
//! Decides which tracked items are due for review. An item is due when it was
//! solved at or before the cutoff (`now - lookback`) and has not been reviewed
//! after the cutoff. Results are oldest-solved first so a capped reminder
//! always shows the longest-neglected items.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use crate::core::error::StoreResult;
use crate::database::ItemStore;
use crate::features::reviews::models::TrackedItem;
use chrono::{DateTime, Duration, Utc};

/// Cutoff for a lookback window evaluated at `now`.
///
/// A window reaching past the earliest representable time clamps to it, so
/// nothing is due.
pub fn cutoff(now: DateTime<Utc>, lookback: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(lookback).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// The due predicate, evaluated against an already computed cutoff
pub fn is_due(item: &TrackedItem, cutoff: DateTime<Utc>) -> bool {
    item.solved_at <= cutoff
        && item
            .last_reviewed_at
            .is_none_or(|reviewed| reviewed <= cutoff)
}

/// Order a due list the way reminders present it: oldest solve first, then id
pub fn sort_due(items: &mut [TrackedItem]) {
    items.sort_by(|a, b| a.solved_at.cmp(&b.solved_at).then(a.id.cmp(&b.id)));
}

/// Items due for `owner` right now. Read-only; safe to call any number of times.
pub async fn due_items<S>(
    store: &S,
    owner: &str,
    lookback: Duration,
) -> StoreResult<Vec<TrackedItem>>
where
    S: ItemStore + ?Sized,
{
    due_items_at(store, owner, lookback, Utc::now()).await
}

/// Same as [`due_items`] with an explicit evaluation time
pub async fn due_items_at<S>(
    store: &S,
    owner: &str,
    lookback: Duration,
    now: DateTime<Utc>,
) -> StoreResult<Vec<TrackedItem>>
where
    S: ItemStore + ?Sized,
{
    let cutoff = cutoff(now, lookback);
    let mut items = store.list_due_items(owner, cutoff).await?;
    items.retain(|item| is_due(item, cutoff));
    sort_due(&mut items);
    Ok(items)
}
