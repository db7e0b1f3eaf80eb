//! Per-user aggregate counters.
//!
//! Counters are bumped inside the item-creation transaction and never
//! recomputed or decremented.

use super::{from_db_time, to_db_time};
use crate::core::error::StoreResult;
use crate::features::reviews::models::{Difficulty, SolveStatus, UserStats};
use chrono::{DateTime, Utc};
use sqlite::{Connection, State};

fn status_column(status: SolveStatus) -> &'static str {
    match status {
        SolveStatus::Solved => "total_solved",
        SolveStatus::NeededHint => "total_needed_hint",
        SolveStatus::Stuck => "total_stuck",
    }
}

fn difficulty_column(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "easy_count",
        Difficulty::Medium => "medium_count",
        Difficulty::Hard => "hard_count",
    }
}

/// Count one new item against its owner's stats, creating the row on first use
pub(super) fn record_item_created(
    conn: &Connection,
    owner: &str,
    status: SolveStatus,
    difficulty: Difficulty,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    {
        let mut insert = conn.prepare("INSERT OR IGNORE INTO user_stats (user_id) VALUES (?)")?;
        insert.bind((1, owner))?;
        insert.next()?;
    }

    let status_column = status_column(status);
    let difficulty_column = difficulty_column(difficulty);
    let active_at = to_db_time(&now);
    let mut update = conn.prepare(format!(
        "UPDATE user_stats
         SET {status_column} = {status_column} + 1,
             {difficulty_column} = {difficulty_column} + 1,
             last_active_at = ?
         WHERE user_id = ?"
    ))?;
    update.bind((1, active_at.as_str()))?;
    update.bind((2, owner))?;
    update.next()?;
    Ok(())
}

pub(super) fn touch_last_active(
    conn: &Connection,
    owner: &str,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    let active_at = to_db_time(&now);
    let mut update = conn.prepare("UPDATE user_stats SET last_active_at = ? WHERE user_id = ?")?;
    update.bind((1, active_at.as_str()))?;
    update.bind((2, owner))?;
    update.next()?;
    Ok(())
}

pub(super) fn load_user_stats(conn: &Connection, owner: &str) -> StoreResult<Option<UserStats>> {
    let mut statement = conn.prepare(
        "SELECT user_id, total_solved, total_needed_hint, total_stuck,
                easy_count, medium_count, hard_count, last_active_at
         FROM user_stats WHERE user_id = ?",
    )?;
    statement.bind((1, owner))?;

    if let State::Done = statement.next()? {
        return Ok(None);
    }

    let last_active_at = statement
        .read::<Option<String>, _>("last_active_at")?
        .map(|value| from_db_time(&value))
        .transpose()?;

    Ok(Some(UserStats {
        owner: statement.read::<String, _>("user_id")?,
        total_solved: statement.read::<i64, _>("total_solved")?,
        total_needed_hint: statement.read::<i64, _>("total_needed_hint")?,
        total_stuck: statement.read::<i64, _>("total_stuck")?,
        easy_count: statement.read::<i64, _>("easy_count")?,
        medium_count: statement.read::<i64, _>("medium_count")?,
        hard_count: statement.read::<i64, _>("hard_count")?,
        last_active_at,
    }))
}
