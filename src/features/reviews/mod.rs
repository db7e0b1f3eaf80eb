//! # Reviews Feature
//!
//! Tracked solved problems and the policy deciding which are due for review.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod models;
pub mod selector;

pub use models::{
    normalize_tags, Difficulty, ItemFilter, NewItem, SolveStatus, TrackedItem, UserStats,
};
pub use selector::{due_items, due_items_at, is_due};
