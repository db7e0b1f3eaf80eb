//! Item and tag queries. Every function takes a connection that the caller
//! has already locked and, for writes, wrapped in a transaction.

use super::{from_db_time, query_scalar, to_db_time};
use crate::core::error::{StoreError, StoreResult};
use crate::features::reviews::models::{
    normalize_tags, Difficulty, ItemFilter, NewItem, SolveStatus, TrackedItem,
};
use chrono::{DateTime, Utc};
use sqlite::{Connection, State, Statement, Value};

const ITEM_COLUMNS: &str = "id, user_id, problem_name, link, difficulty, category, status, \
     solved_at, last_reviewed_at, review_count, notes";

pub(super) fn insert_item(conn: &Connection, item: &NewItem) -> StoreResult<i64> {
    let solved_at = to_db_time(&item.solved_at);
    {
        let mut statement = conn.prepare(
            "INSERT INTO items
                 (user_id, problem_name, link, difficulty, category, status, solved_at, notes)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )?;
        statement.bind((1, item.owner.as_str()))?;
        statement.bind((2, item.name.trim()))?;
        statement.bind((3, item.link.as_deref()))?;
        statement.bind((4, item.difficulty.as_str()))?;
        statement.bind((5, item.category.trim()))?;
        statement.bind((6, item.status.as_str()))?;
        statement.bind((7, solved_at.as_str()))?;
        statement.bind((8, item.notes.as_deref()))?;
        statement.next()?;
    }
    query_scalar(conn, "SELECT last_insert_rowid()")
}

/// Replace every mutable field. Returns false when no row has this id.
pub(super) fn update_item_fields(conn: &Connection, item: &TrackedItem) -> StoreResult<bool> {
    let solved_at = to_db_time(&item.solved_at);
    let last_reviewed_at = item.last_reviewed_at.as_ref().map(to_db_time);
    {
        let mut statement = conn.prepare(
            "UPDATE items
             SET problem_name = ?, link = ?, difficulty = ?, category = ?, status = ?,
                 solved_at = ?, last_reviewed_at = ?, review_count = ?, notes = ?
             WHERE id = ?",
        )?;
        statement.bind((1, item.name.trim()))?;
        statement.bind((2, item.link.as_deref()))?;
        statement.bind((3, item.difficulty.as_str()))?;
        statement.bind((4, item.category.trim()))?;
        statement.bind((5, item.status.as_str()))?;
        statement.bind((6, solved_at.as_str()))?;
        statement.bind((7, last_reviewed_at.as_deref()))?;
        statement.bind((8, item.review_count))?;
        statement.bind((9, item.notes.as_deref()))?;
        statement.bind((10, item.id))?;
        statement.next()?;
    }
    Ok(query_scalar(conn, "SELECT changes()")? > 0)
}

/// Returns false when no row has this id. Tag links go with the row (ON DELETE CASCADE).
pub(super) fn delete_item(conn: &Connection, id: i64) -> StoreResult<bool> {
    {
        let mut statement = conn.prepare("DELETE FROM items WHERE id = ?")?;
        statement.bind((1, id))?;
        statement.next()?;
    }
    Ok(query_scalar(conn, "SELECT changes()")? > 0)
}

pub(super) fn increment_review_count(
    conn: &Connection,
    id: i64,
    now: DateTime<Utc>,
) -> StoreResult<bool> {
    let reviewed_at = to_db_time(&now);
    {
        let mut statement = conn.prepare(
            "UPDATE items SET review_count = review_count + 1, last_reviewed_at = ? WHERE id = ?",
        )?;
        statement.bind((1, reviewed_at.as_str()))?;
        statement.bind((2, id))?;
        statement.next()?;
    }
    Ok(query_scalar(conn, "SELECT changes()")? > 0)
}

/// Upsert each normalized tag and link it to the item
pub(super) fn attach_tags(conn: &Connection, item_id: i64, tags: &[String]) -> StoreResult<()> {
    for tag in normalize_tags(tags) {
        {
            let mut insert = conn.prepare("INSERT OR IGNORE INTO tags (name) VALUES (?)")?;
            insert.bind((1, tag.as_str()))?;
            insert.next()?;
        }

        let tag_id = {
            let mut select = conn.prepare("SELECT id FROM tags WHERE name = ?")?;
            select.bind((1, tag.as_str()))?;
            match select.next()? {
                State::Row => select.read::<i64, _>(0)?,
                State::Done => {
                    return Err(StoreError::Corrupt(format!("tag {tag:?} vanished after upsert")))
                }
            }
        };

        let mut link =
            conn.prepare("INSERT OR IGNORE INTO item_tags (item_id, tag_id) VALUES (?, ?)")?;
        link.bind((1, item_id))?;
        link.bind((2, tag_id))?;
        link.next()?;
    }
    Ok(())
}

pub(super) fn detach_all_tags(conn: &Connection, item_id: i64) -> StoreResult<()> {
    let mut statement = conn.prepare("DELETE FROM item_tags WHERE item_id = ?")?;
    statement.bind((1, item_id))?;
    statement.next()?;
    Ok(())
}

/// Remove tags no item links to. Returns how many were removed.
pub(super) fn prune_orphan_tags(conn: &Connection) -> StoreResult<i64> {
    conn.execute("DELETE FROM tags WHERE id NOT IN (SELECT DISTINCT tag_id FROM item_tags)")?;
    query_scalar(conn, "SELECT changes()")
}

pub(super) fn list_tags(conn: &Connection) -> StoreResult<Vec<String>> {
    let mut statement = conn.prepare("SELECT name FROM tags ORDER BY name")?;
    let mut tags = Vec::new();
    while let State::Row = statement.next()? {
        tags.push(statement.read::<String, _>(0)?);
    }
    Ok(tags)
}

fn item_tags(conn: &Connection, item_id: i64) -> StoreResult<Vec<String>> {
    let mut statement = conn.prepare(
        "SELECT t.name FROM item_tags it JOIN tags t ON t.id = it.tag_id
         WHERE it.item_id = ? ORDER BY t.name",
    )?;
    statement.bind((1, item_id))?;
    let mut tags = Vec::new();
    while let State::Row = statement.next()? {
        tags.push(statement.read::<String, _>(0)?);
    }
    Ok(tags)
}

pub(super) fn find_item(conn: &Connection, id: i64) -> StoreResult<Option<TrackedItem>> {
    let mut items = query_items(
        conn,
        &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"),
        &[Value::Integer(id)],
    )?;
    Ok(items.pop())
}

pub(super) fn list_items(conn: &Connection, filter: &ItemFilter) -> StoreResult<Vec<TrackedItem>> {
    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(owner) = filter.owner.as_deref().filter(|o| !o.is_empty()) {
        conditions.push("user_id = ?".to_string());
        params.push(Value::String(owner.to_string()));
    }
    if let Some(status) = filter.status {
        conditions.push("status = ?".to_string());
        params.push(Value::String(status.as_str().to_string()));
    }
    if let Some(difficulty) = filter.difficulty {
        conditions.push("difficulty = ?".to_string());
        params.push(Value::String(difficulty.as_str().to_string()));
    }
    if let Some(category) = filter.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        conditions.push("category = ?".to_string());
        params.push(Value::String(category.to_string()));
    }

    let tags = normalize_tags(&filter.tags);
    if !tags.is_empty() {
        let placeholders = vec!["?"; tags.len()].join(", ");
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM item_tags it JOIN tags t ON t.id = it.tag_id
                     WHERE it.item_id = items.id AND t.name IN ({placeholders}))"
        ));
        params.extend(tags.into_iter().map(Value::String));
    }

    let mut sql = format!("SELECT {ITEM_COLUMNS} FROM items");
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY solved_at DESC, id DESC");

    if filter.limit.is_some() || filter.offset.is_some() {
        sql.push_str(" LIMIT ? OFFSET ?");
        params.push(Value::Integer(filter.limit.map(i64::from).unwrap_or(-1)));
        params.push(Value::Integer(filter.offset.map(i64::from).unwrap_or(0)));
    }

    query_items(conn, &sql, &params)
}

pub(super) fn list_distinct_owners(conn: &Connection) -> StoreResult<Vec<String>> {
    let mut statement = conn.prepare("SELECT DISTINCT user_id FROM items")?;
    let mut owners = Vec::new();
    while let State::Row = statement.next()? {
        owners.push(statement.read::<String, _>(0)?);
    }
    Ok(owners)
}

/// Items solved at or before `cutoff` and not reviewed since, oldest first
pub(super) fn list_due_items(
    conn: &Connection,
    owner: &str,
    cutoff: DateTime<Utc>,
) -> StoreResult<Vec<TrackedItem>> {
    let cutoff = to_db_time(&cutoff);
    query_items(
        conn,
        &format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE user_id = ? AND solved_at <= ?
               AND (last_reviewed_at IS NULL OR last_reviewed_at <= ?)
             ORDER BY solved_at ASC, id ASC"
        ),
        &[
            Value::String(owner.to_string()),
            Value::String(cutoff.clone()),
            Value::String(cutoff),
        ],
    )
}

fn query_items(conn: &Connection, sql: &str, params: &[Value]) -> StoreResult<Vec<TrackedItem>> {
    let mut items = Vec::new();
    {
        let mut statement = conn.prepare(sql)?;
        for (index, value) in params.iter().enumerate() {
            statement.bind((index + 1, value.clone()))?;
        }
        while let State::Row = statement.next()? {
            items.push(read_item(&statement)?);
        }
    }

    for item in &mut items {
        item.tags = item_tags(conn, item.id)?;
    }
    Ok(items)
}

fn read_item(statement: &Statement<'_>) -> StoreResult<TrackedItem> {
    let last_reviewed_at = statement
        .read::<Option<String>, _>("last_reviewed_at")?
        .map(|value| from_db_time(&value))
        .transpose()?;

    Ok(TrackedItem {
        id: statement.read::<i64, _>("id")?,
        owner: statement.read::<String, _>("user_id")?,
        name: statement.read::<String, _>("problem_name")?,
        link: statement.read::<Option<String>, _>("link")?,
        difficulty: statement
            .read::<String, _>("difficulty")?
            .parse::<Difficulty>()
            .map_err(corrupt)?,
        category: statement.read::<String, _>("category")?,
        status: statement
            .read::<String, _>("status")?
            .parse::<SolveStatus>()
            .map_err(corrupt)?,
        solved_at: from_db_time(&statement.read::<String, _>("solved_at")?)?,
        last_reviewed_at,
        review_count: statement.read::<i64, _>("review_count")?,
        notes: statement.read::<Option<String>, _>("notes")?,
        tags: Vec::new(),
    })
}

/// An enum value that fails to parse on the way out of the database is corruption,
/// not a caller mistake
fn corrupt(err: StoreError) -> StoreError {
    match err {
        StoreError::Validation(message) => StoreError::Corrupt(message),
        other => other,
    }
}
