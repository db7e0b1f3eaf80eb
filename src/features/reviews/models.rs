//! # Tracked Item Models
//!
//! Solved problems, their enumerated attributes, and per-user aggregate stats.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Tag normalization moved here from the database layer
//! - 1.0.0: Initial release

use crate::core::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Problem difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(StoreError::Validation(format!("invalid difficulty: {s}"))),
        }
    }
}

/// How the user got to the solution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolveStatus {
    Solved,
    NeededHint,
    Stuck,
}

impl SolveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolveStatus::Solved => "Solved",
            SolveStatus::NeededHint => "Needed Hint",
            SolveStatus::Stuck => "Stuck",
        }
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SolveStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "solved" => Ok(SolveStatus::Solved),
            "needed hint" | "needed_hint" | "neededhint" => Ok(SolveStatus::NeededHint),
            "stuck" => Ok(SolveStatus::Stuck),
            _ => Err(StoreError::Validation(format!("invalid status: {s}"))),
        }
    }
}

/// A solved problem submitted by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedItem {
    /// Store-assigned identifier
    pub id: i64,

    /// User who submitted the item; never changes
    pub owner: String,

    pub name: String,

    pub link: Option<String>,

    pub difficulty: Difficulty,

    pub category: String,

    pub status: SolveStatus,

    /// When the problem was solved
    pub solved_at: DateTime<Utc>,

    /// When the last confirmed review reminder went out
    pub last_reviewed_at: Option<DateTime<Utc>>,

    pub review_count: i64,

    pub notes: Option<String>,

    /// Tag names, sorted
    pub tags: Vec<String>,
}

impl TrackedItem {
    /// Check required fields before an update is written
    pub fn validate(&self) -> StoreResult<()> {
        validate_fields(&self.owner, &self.name, &self.category)?;
        if self.review_count < 0 {
            return Err(StoreError::validation("review count cannot be negative"));
        }
        Ok(())
    }
}

/// Input for creating a tracked item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub owner: String,
    pub name: String,
    pub link: Option<String>,
    pub difficulty: Difficulty,
    pub category: String,
    pub status: SolveStatus,
    pub solved_at: DateTime<Utc>,
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewItem {
    /// Minimal item solved right now, with no link, notes or tags
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        difficulty: Difficulty,
        category: impl Into<String>,
        status: SolveStatus,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            link: None,
            difficulty,
            category: category.into(),
            status,
            solved_at: Utc::now(),
            notes: None,
            tags: Vec::new(),
        }
    }

    pub fn solved_at(mut self, solved_at: DateTime<Utc>) -> Self {
        self.solved_at = solved_at;
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> StoreResult<()> {
        validate_fields(&self.owner, &self.name, &self.category)
    }
}

fn validate_fields(owner: &str, name: &str, category: &str) -> StoreResult<()> {
    if owner.trim().is_empty() {
        return Err(StoreError::validation("owner is required"));
    }
    if name.trim().is_empty() {
        return Err(StoreError::validation("problem name is required"));
    }
    if category.trim().is_empty() {
        return Err(StoreError::validation("category is required"));
    }
    Ok(())
}

/// Trim tag names, drop empty ones and collapse duplicates.
///
/// Case is preserved, so `dp` and `Dp` stay distinct. First-seen order is kept.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() || normalized.iter().any(|t| t == trimmed) {
            continue;
        }
        normalized.push(trimmed.to_string());
    }
    normalized
}

/// Filters for listing items. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub owner: Option<String>,
    pub status: Option<SolveStatus>,
    pub difficulty: Option<Difficulty>,
    pub category: Option<String>,
    /// Item matches when it carries at least one of these tags
    pub tags: Vec<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ItemFilter {
    pub fn for_owner(owner: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            ..Default::default()
        }
    }
}

/// Aggregate activity counters for one user.
///
/// Counters only ever grow: deleting an item does not roll back its contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub owner: String,
    pub total_solved: i64,
    pub total_needed_hint: i64,
    pub total_stuck: i64,
    pub easy_count: i64,
    pub medium_count: i64,
    pub hard_count: i64,
    pub last_active_at: Option<DateTime<Utc>>,
}

impl UserStats {
    /// Total items ever recorded for this user
    pub fn total_items(&self) -> i64 {
        self.total_solved + self.total_needed_hint + self.total_stuck
    }
}
