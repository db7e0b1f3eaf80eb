//! # Database
//!
//! SQLite persistence for tracked items, tags and per-user stats.
//! A single connection is shared behind an async mutex; every write runs in
//! its own `BEGIN IMMEDIATE` transaction.
//!
//! - **Version**: 1.2.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.2.0: Orphaned tags pruned on delete and tag resync
//! - 1.1.0: Store operations exposed through the `ItemStore` trait
//! - 1.0.0: Initial release

mod items;
mod migrations;
mod stats;
mod store;

pub use store::ItemStore;

use crate::core::error::{StoreError, StoreResult};
use crate::features::reviews::models::{ItemFilter, NewItem, TrackedItem, UserStats};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use log::{debug, info, warn};
use sqlite::Connection;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Fixed-width UTC format; lexicographic order equals chronological order
const DB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// How long a writer waits on a locked database file
const BUSY_TIMEOUT_MS: usize = 5_000;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path` and bring the schema up to date.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub async fn new(path: &str) -> StoreResult<Self> {
        let mut connection = sqlite::open(path)?;
        connection.set_busy_timeout(BUSY_TIMEOUT_MS)?;
        connection.execute("PRAGMA foreign_keys = ON")?;
        migrations::migrate(&connection)?;

        info!("Database ready at {path}");

        Ok(Database {
            conn: Arc::new(Mutex::new(connection)),
        })
    }

    /// All stored tag names, sorted
    pub async fn list_tags(&self) -> StoreResult<Vec<String>> {
        let conn = self.conn.lock().await;
        items::list_tags(&conn)
    }

    /// Mark a user as active without touching their counters
    pub async fn touch_user_last_active(&self, owner: &str) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        stats::touch_last_active(&conn, owner, Utc::now())
    }
}

#[async_trait]
impl ItemStore for Database {
    async fn create_item(&self, item: &NewItem) -> StoreResult<i64> {
        item.validate()?;

        let conn = self.conn.lock().await;
        let tx = Transaction::begin(&conn)?;
        let now = Utc::now();
        let id = items::insert_item(tx.conn(), item)?;
        items::attach_tags(tx.conn(), id, &item.tags)?;
        stats::record_item_created(tx.conn(), &item.owner, item.status, item.difficulty, now)?;
        tx.commit()?;

        info!("Created item {} ({}) for user {}", id, item.name, item.owner);
        Ok(id)
    }

    async fn get_item(&self, id: i64) -> StoreResult<TrackedItem> {
        let conn = self.conn.lock().await;
        items::find_item(&conn, id)?.ok_or(StoreError::NotFound(id))
    }

    async fn update_item(&self, item: &TrackedItem) -> StoreResult<()> {
        item.validate()?;

        let conn = self.conn.lock().await;
        let tx = Transaction::begin(&conn)?;
        if !items::update_item_fields(tx.conn(), item)? {
            return Err(StoreError::NotFound(item.id));
        }
        items::detach_all_tags(tx.conn(), item.id)?;
        items::attach_tags(tx.conn(), item.id, &item.tags)?;
        let pruned = items::prune_orphan_tags(tx.conn())?;
        tx.commit()?;

        debug!("Updated item {} (pruned {pruned} orphan tags)", item.id);
        Ok(())
    }

    async fn delete_item(&self, id: i64) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        let tx = Transaction::begin(&conn)?;
        if !items::delete_item(tx.conn(), id)? {
            return Err(StoreError::NotFound(id));
        }
        let pruned = items::prune_orphan_tags(tx.conn())?;
        tx.commit()?;

        info!("Deleted item {id} (pruned {pruned} orphan tags)");
        Ok(())
    }

    async fn list_items(&self, filter: &ItemFilter) -> StoreResult<Vec<TrackedItem>> {
        let conn = self.conn.lock().await;
        items::list_items(&conn, filter)
    }

    async fn list_distinct_owners(&self) -> StoreResult<Vec<String>> {
        let conn = self.conn.lock().await;
        items::list_distinct_owners(&conn)
    }

    async fn list_due_items(
        &self,
        owner: &str,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<TrackedItem>> {
        let conn = self.conn.lock().await;
        items::list_due_items(&conn, owner, cutoff)
    }

    async fn increment_review_count(&self, id: i64) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        let tx = Transaction::begin(&conn)?;
        if !items::increment_review_count(tx.conn(), id, Utc::now())? {
            return Err(StoreError::NotFound(id));
        }
        tx.commit()
    }

    async fn get_user_stats(&self, owner: &str) -> StoreResult<Option<UserStats>> {
        let conn = self.conn.lock().await;
        stats::load_user_stats(&conn, owner)
    }
}

/// Scoped transaction: rolled back on drop unless `commit` succeeded
pub(crate) struct Transaction<'c> {
    conn: &'c Connection,
    committed: bool,
}

impl<'c> Transaction<'c> {
    pub(crate) fn begin(conn: &'c Connection) -> StoreResult<Self> {
        conn.execute("BEGIN IMMEDIATE")?;
        Ok(Transaction {
            conn,
            committed: false,
        })
    }

    pub(crate) fn conn(&self) -> &'c Connection {
        self.conn
    }

    pub(crate) fn commit(mut self) -> StoreResult<()> {
        self.conn.execute("COMMIT")?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = self.conn.execute("ROLLBACK") {
                warn!("Failed to roll back transaction: {e}");
            }
        }
    }
}

pub(crate) fn to_db_time(time: &DateTime<Utc>) -> String {
    time.format(DB_TIME_FORMAT).to_string()
}

pub(crate) fn from_db_time(value: &str) -> StoreResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, DB_TIME_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {value:?}: {e}")))
}

/// Read the single integer produced by a scalar query such as `SELECT changes()`
pub(crate) fn query_scalar(conn: &Connection, sql: &str) -> StoreResult<i64> {
    let mut statement = conn.prepare(sql)?;
    statement.next()?;
    Ok(statement.read::<i64, _>(0)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reviews::models::{Difficulty, SolveStatus};
    use chrono::Duration;

    async fn test_db() -> Database {
        Database::new(":memory:").await.unwrap()
    }

    fn item(owner: &str, name: &str) -> NewItem {
        NewItem::new(owner, name, Difficulty::Medium, "Graphs", SolveStatus::Solved)
    }

    #[test]
    fn test_db_time_round_trip_keeps_millis() {
        let time = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap() + Duration::milliseconds(42);
        let stored = to_db_time(&time);
        assert_eq!(stored, "2024-03-09 07:05:01.042");
        assert_eq!(from_db_time(&stored).unwrap(), time);
        assert!(matches!(from_db_time("yesterday"), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_db_time_sorts_lexicographically() {
        let earlier = Utc.with_ymd_and_hms(2024, 9, 30, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();
        assert!(to_db_time(&earlier) < to_db_time(&later));
    }

    #[tokio::test]
    async fn test_create_and_get_item() {
        let db = test_db().await;
        let solved_at = Utc::now() - Duration::days(3);
        let new_item = item("u1", "Course Schedule")
            .solved_at(solved_at)
            .with_link("https://leetcode.com/problems/course-schedule/")
            .with_notes("topological sort")
            .with_tags(["graph", "bfs"]);

        let id = db.create_item(&new_item).await.unwrap();
        let stored = db.get_item(id).await.unwrap();

        assert_eq!(stored.id, id);
        assert_eq!(stored.owner, "u1");
        assert_eq!(stored.name, "Course Schedule");
        assert_eq!(stored.difficulty, Difficulty::Medium);
        assert_eq!(stored.status, SolveStatus::Solved);
        assert_eq!(stored.link.as_deref(), Some("https://leetcode.com/problems/course-schedule/"));
        assert_eq!(stored.notes.as_deref(), Some("topological sort"));
        assert_eq!(stored.review_count, 0);
        assert!(stored.last_reviewed_at.is_none());
        assert_eq!(stored.tags, vec!["bfs", "graph"]);
        assert!((stored.solved_at - solved_at).num_milliseconds().abs() < 1);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let db = test_db().await;
        let a = db.create_item(&item("u1", "A")).await.unwrap();
        let b = db.create_item(&item("u1", "B")).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_item_without_writing() {
        let db = test_db().await;
        let mut invalid = item("u1", "");
        invalid.tags = vec!["dp".to_string()];

        let err = db.create_item(&invalid).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(db.list_distinct_owners().await.unwrap().is_empty());
        assert!(db.list_tags().await.unwrap().is_empty());
        assert!(db.get_user_stats("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tags_trimmed_and_case_preserved() {
        let db = test_db().await;
        let id = db
            .create_item(&item("u1", "Climbing Stairs").with_tags(["dp", " dp ", "Dp"]))
            .await
            .unwrap();

        assert_eq!(db.get_item(id).await.unwrap().tags, vec!["Dp", "dp"]);
        assert_eq!(db.list_tags().await.unwrap(), vec!["Dp", "dp"]);
    }

    #[tokio::test]
    async fn test_tags_shared_between_items() {
        let db = test_db().await;
        db.create_item(&item("u1", "A").with_tags(["dp"])).await.unwrap();
        db.create_item(&item("u2", "B").with_tags(["dp", "greedy"])).await.unwrap();
        assert_eq!(db.list_tags().await.unwrap(), vec!["dp", "greedy"]);
    }

    #[tokio::test]
    async fn test_get_missing_item() {
        let db = test_db().await;
        assert!(matches!(db.get_item(99).await, Err(StoreError::NotFound(99))));
    }

    #[tokio::test]
    async fn test_update_replaces_fields_and_resyncs_tags() {
        let db = test_db().await;
        let id = db
            .create_item(&item("u1", "Old Name").with_tags(["dp", "memo"]))
            .await
            .unwrap();

        let mut stored = db.get_item(id).await.unwrap();
        stored.name = "New Name".to_string();
        stored.status = SolveStatus::Stuck;
        stored.difficulty = Difficulty::Hard;
        stored.link = Some("https://example.com".to_string());
        stored.tags = vec![" memo ".to_string(), "bitmask".to_string()];
        db.update_item(&stored).await.unwrap();

        let updated = db.get_item(id).await.unwrap();
        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.status, SolveStatus::Stuck);
        assert_eq!(updated.difficulty, Difficulty::Hard);
        assert_eq!(updated.link.as_deref(), Some("https://example.com"));
        assert_eq!(updated.tags, vec!["bitmask", "memo"]);
        // "dp" lost its only link
        assert_eq!(db.list_tags().await.unwrap(), vec!["bitmask", "memo"]);
    }

    #[tokio::test]
    async fn test_update_never_changes_owner() {
        let db = test_db().await;
        let id = db.create_item(&item("u1", "A")).await.unwrap();
        let mut stored = db.get_item(id).await.unwrap();
        stored.owner = "someone-else".to_string();
        db.update_item(&stored).await.unwrap();
        assert_eq!(db.get_item(id).await.unwrap().owner, "u1");
    }

    #[tokio::test]
    async fn test_update_missing_item() {
        let db = test_db().await;
        let id = db.create_item(&item("u1", "A")).await.unwrap();
        let mut stored = db.get_item(id).await.unwrap();
        stored.id = id + 100;
        stored.tags = vec!["ghost".to_string()];

        assert!(matches!(db.update_item(&stored).await, Err(StoreError::NotFound(_))));
        assert!(db.list_tags().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_failing_midway_leaves_nothing_behind() {
        let db = test_db().await;
        // the stats write comes after the item and tag inserts
        db.conn.lock().await.execute("DROP TABLE user_stats").unwrap();

        let new_item = item("u1", "A").with_tags(["graph", "bfs"]);
        assert!(matches!(
            db.create_item(&new_item).await,
            Err(StoreError::Transaction(_))
        ));

        assert!(db.list_distinct_owners().await.unwrap().is_empty());
        assert!(db.list_tags().await.unwrap().is_empty());
        let conn = db.conn.lock().await;
        assert_eq!(query_scalar(&conn, "SELECT COUNT(*) FROM items").unwrap(), 0);
        assert_eq!(query_scalar(&conn, "SELECT COUNT(*) FROM item_tags").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_owner_kept_exactly_as_submitted() {
        let db = test_db().await;
        let id = db.create_item(&item(" 100 ", "A")).await.unwrap();

        assert_eq!(db.get_item(id).await.unwrap().owner, " 100 ");
        assert_eq!(db.list_distinct_owners().await.unwrap(), vec![" 100 "]);
        let stats = db.get_user_stats(" 100 ").await.unwrap().unwrap();
        assert_eq!(stats.total_items(), 1);
        let listed = db.list_items(&ItemFilter::for_owner(" 100 ")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(db.get_user_stats("100").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_validates() {
        let db = test_db().await;
        let id = db.create_item(&item("u1", "A")).await.unwrap();
        let mut stored = db.get_item(id).await.unwrap();
        stored.category = "  ".to_string();
        assert!(matches!(db.update_item(&stored).await, Err(StoreError::Validation(_))));
        assert_eq!(db.get_item(id).await.unwrap().category, "Graphs");
    }

    #[tokio::test]
    async fn test_delete_item_prunes_orphans_but_keeps_stats() {
        let db = test_db().await;
        let keep = db.create_item(&item("u1", "Keep").with_tags(["shared"])).await.unwrap();
        let gone = db
            .create_item(&item("u1", "Gone").with_tags(["shared", "lonely"]))
            .await
            .unwrap();

        db.delete_item(gone).await.unwrap();

        assert!(matches!(db.get_item(gone).await, Err(StoreError::NotFound(_))));
        assert_eq!(db.get_item(keep).await.unwrap().tags, vec!["shared"]);
        assert_eq!(db.list_tags().await.unwrap(), vec!["shared"]);

        let stats = db.get_user_stats("u1").await.unwrap().unwrap();
        assert_eq!(stats.total_solved, 2);
        assert_eq!(stats.medium_count, 2);
    }

    #[tokio::test]
    async fn test_delete_missing_item() {
        let db = test_db().await;
        assert!(matches!(db.delete_item(5).await, Err(StoreError::NotFound(5))));
    }

    #[tokio::test]
    async fn test_list_items_filters_and_order() {
        let db = test_db().await;
        let now = Utc::now();
        let old = db
            .create_item(
                &NewItem::new("u1", "Old", Difficulty::Easy, "Arrays", SolveStatus::Solved)
                    .solved_at(now - Duration::days(10))
                    .with_tags(["two-pointers"]),
            )
            .await
            .unwrap();
        let mid = db
            .create_item(
                &NewItem::new("u1", "Mid", Difficulty::Hard, "Graphs", SolveStatus::Stuck)
                    .solved_at(now - Duration::days(5))
                    .with_tags(["dfs", "bfs"]),
            )
            .await
            .unwrap();
        let new = db
            .create_item(
                &NewItem::new("u1", "New", Difficulty::Easy, "Arrays", SolveStatus::NeededHint)
                    .solved_at(now - Duration::days(1)),
            )
            .await
            .unwrap();
        db.create_item(&item("u2", "Other")).await.unwrap();

        let ids = |items: Vec<TrackedItem>| items.into_iter().map(|i| i.id).collect::<Vec<_>>();

        let all_u1 = db.list_items(&ItemFilter::for_owner("u1")).await.unwrap();
        assert_eq!(ids(all_u1), vec![new, mid, old]);

        let easy = ItemFilter {
            difficulty: Some(Difficulty::Easy),
            ..ItemFilter::for_owner("u1")
        };
        assert_eq!(ids(db.list_items(&easy).await.unwrap()), vec![new, old]);

        let stuck = ItemFilter {
            status: Some(SolveStatus::Stuck),
            ..Default::default()
        };
        assert_eq!(ids(db.list_items(&stuck).await.unwrap()), vec![mid]);

        let arrays = ItemFilter {
            category: Some("Arrays".to_string()),
            ..ItemFilter::for_owner("u1")
        };
        assert_eq!(ids(db.list_items(&arrays).await.unwrap()), vec![new, old]);

        // any-of semantics, no duplicates for items matching several tags
        let tagged = ItemFilter {
            tags: vec!["dfs".to_string(), "bfs".to_string(), "two-pointers".to_string()],
            ..Default::default()
        };
        assert_eq!(ids(db.list_items(&tagged).await.unwrap()), vec![mid, old]);

        let paged = ItemFilter {
            limit: Some(1),
            offset: Some(1),
            ..ItemFilter::for_owner("u1")
        };
        assert_eq!(ids(db.list_items(&paged).await.unwrap()), vec![mid]);

        let offset_only = ItemFilter {
            offset: Some(2),
            ..ItemFilter::for_owner("u1")
        };
        assert_eq!(ids(db.list_items(&offset_only).await.unwrap()), vec![old]);

        assert_eq!(db.list_items(&ItemFilter::default()).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_list_distinct_owners() {
        let db = test_db().await;
        db.create_item(&item("u1", "A")).await.unwrap();
        db.create_item(&item("u2", "B")).await.unwrap();
        db.create_item(&item("u1", "C")).await.unwrap();

        let mut owners = db.list_distinct_owners().await.unwrap();
        owners.sort();
        assert_eq!(owners, vec!["u1", "u2"]);
    }

    #[tokio::test]
    async fn test_increment_review_count() {
        let db = test_db().await;
        let id = db.create_item(&item("u1", "A")).await.unwrap();

        for _ in 0..2 {
            db.increment_review_count(id).await.unwrap();
        }
        let before_last = Utc::now();
        db.increment_review_count(id).await.unwrap();
        let after_last = Utc::now();

        let stored = db.get_item(id).await.unwrap();
        assert_eq!(stored.review_count, 3);
        let reviewed = stored.last_reviewed_at.unwrap();
        assert!(reviewed >= before_last - Duration::milliseconds(1));
        assert!(reviewed <= after_last);
    }

    #[tokio::test]
    async fn test_increment_missing_item_fails() {
        let db = test_db().await;
        assert!(matches!(
            db.increment_review_count(1).await,
            Err(StoreError::NotFound(1))
        ));
    }

    #[tokio::test]
    async fn test_stats_for_stuck_hard_item() {
        let db = test_db().await;
        db.create_item(&item("u1", "Warmup")).await.unwrap();
        let before = db.get_user_stats("u1").await.unwrap().unwrap();

        let created_from = Utc::now();
        db.create_item(&NewItem::new(
            "u1",
            "Median of Two Sorted Arrays",
            Difficulty::Hard,
            "Binary Search",
            SolveStatus::Stuck,
        ))
        .await
        .unwrap();
        let created_to = Utc::now();

        let after = db.get_user_stats("u1").await.unwrap().unwrap();
        assert_eq!(after.total_stuck, before.total_stuck + 1);
        assert_eq!(after.hard_count, before.hard_count + 1);
        assert_eq!(after.total_solved, before.total_solved);
        assert_eq!(after.total_needed_hint, before.total_needed_hint);
        assert_eq!(after.easy_count, before.easy_count);
        assert_eq!(after.medium_count, before.medium_count);

        let active = after.last_active_at.unwrap();
        assert!(active >= created_from - Duration::milliseconds(1));
        assert!(active <= created_to);
    }

    #[tokio::test]
    async fn test_stats_match_item_counts() {
        let db = test_db().await;
        let rows = [
            (Difficulty::Easy, SolveStatus::Solved),
            (Difficulty::Easy, SolveStatus::NeededHint),
            (Difficulty::Medium, SolveStatus::Solved),
            (Difficulty::Hard, SolveStatus::Stuck),
        ];
        for (i, (difficulty, status)) in rows.iter().enumerate() {
            db.create_item(&NewItem::new("u1", format!("P{i}"), *difficulty, "Misc", *status))
                .await
                .unwrap();
        }

        let stats = db.get_user_stats("u1").await.unwrap().unwrap();
        assert_eq!(stats.total_solved, 2);
        assert_eq!(stats.total_needed_hint, 1);
        assert_eq!(stats.total_stuck, 1);
        assert_eq!(stats.easy_count, 2);
        assert_eq!(stats.medium_count, 1);
        assert_eq!(stats.hard_count, 1);
        assert_eq!(stats.total_items(), 4);
    }

    #[tokio::test]
    async fn test_stats_absent_for_unknown_user() {
        let db = test_db().await;
        assert!(db.get_user_stats("nobody").await.unwrap().is_none());
        // no row is created by touching an unknown user
        db.touch_user_last_active("nobody").await.unwrap();
        assert!(db.get_user_stats("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_touch_user_last_active() {
        let db = test_db().await;
        db.create_item(&item("u1", "A")).await.unwrap();
        let first = db.get_user_stats("u1").await.unwrap().unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        db.touch_user_last_active("u1").await.unwrap();

        let touched = db.get_user_stats("u1").await.unwrap().unwrap();
        assert!(touched.last_active_at > first.last_active_at);
        assert_eq!(touched.total_solved, first.total_solved);
    }
}
