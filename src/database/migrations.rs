//! Versioned schema migrations, applied in one transaction when the database opens.

use super::{query_scalar, to_db_time, Transaction};
use crate::core::error::{StoreError, StoreResult};
use chrono::Utc;
use log::{debug, info};
use sqlite::Connection;

const CURRENT_VERSION: i64 = 1;

const SCHEMA_V1: &str = "
    CREATE TABLE IF NOT EXISTS items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        problem_name TEXT NOT NULL,
        link TEXT,
        difficulty TEXT NOT NULL,
        category TEXT NOT NULL,
        status TEXT NOT NULL,
        solved_at TEXT NOT NULL,
        last_reviewed_at TEXT,
        review_count INTEGER NOT NULL DEFAULT 0,
        notes TEXT
    );

    CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS item_tags (
        item_id INTEGER NOT NULL,
        tag_id INTEGER NOT NULL,
        PRIMARY KEY (item_id, tag_id),
        FOREIGN KEY (item_id) REFERENCES items(id) ON DELETE CASCADE,
        FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS user_stats (
        user_id TEXT PRIMARY KEY,
        total_solved INTEGER NOT NULL DEFAULT 0,
        total_needed_hint INTEGER NOT NULL DEFAULT 0,
        total_stuck INTEGER NOT NULL DEFAULT 0,
        easy_count INTEGER NOT NULL DEFAULT 0,
        medium_count INTEGER NOT NULL DEFAULT 0,
        hard_count INTEGER NOT NULL DEFAULT 0,
        last_active_at TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_items_user_id ON items(user_id);
    CREATE INDEX IF NOT EXISTS idx_items_status ON items(status);
    CREATE INDEX IF NOT EXISTS idx_items_difficulty ON items(difficulty);
    CREATE INDEX IF NOT EXISTS idx_items_category ON items(category);
    CREATE INDEX IF NOT EXISTS idx_items_user_solved_at ON items(user_id, solved_at);
    CREATE INDEX IF NOT EXISTS idx_item_tags_tag_id ON item_tags(tag_id);
";

pub(super) fn migrate(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
    )?;

    let version = query_scalar(conn, "SELECT COALESCE(MAX(version), 0) FROM schema_migrations")?;
    if version >= CURRENT_VERSION {
        debug!("Database schema at v{version}, nothing to migrate");
        return Ok(());
    }

    let tx = Transaction::begin(conn)?;
    for next in (version + 1)..=CURRENT_VERSION {
        info!("Applying database migration v{next}");
        match next {
            1 => tx.conn().execute(SCHEMA_V1)?,
            _ => {
                return Err(StoreError::Corrupt(format!(
                    "unknown migration version {next}"
                )))
            }
        }

        let applied_at = to_db_time(&Utc::now());
        let mut statement = tx
            .conn()
            .prepare("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")?;
        statement.bind((1, next))?;
        statement.bind((2, applied_at.as_str()))?;
        statement.next()?;
    }
    tx.commit()?;

    info!("Database schema is at v{CURRENT_VERSION}");
    Ok(())
}
