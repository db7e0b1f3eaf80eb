//! Reminder message formatting.
//!
//! One message per owner per cycle. The message lists at most
//! `max_items` items, oldest first, and always fits in a single Discord
//! message. Items that don't fit are left for later cycles.

use crate::core::response::{truncate_to, MESSAGE_LIMIT};
use crate::features::reviews::TrackedItem;

const NAME_LIMIT: usize = 150;
const LINK_LIMIT: usize = 300;
const FOOTER: &str = "\nRemember, consistent review helps reinforce your understanding!";

/// A formatted reminder and the items it actually lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderMessage {
    pub text: String,
    /// Ids of the listed items, in listing order
    pub item_ids: Vec<i64>,
    /// Due items left out of this message
    pub remaining: usize,
}

fn header(mention: Option<&str>) -> String {
    match mention {
        Some(mention) => {
            format!("Hey {mention}! Here are some problems you might want to review today:\n")
        }
        None => "Hey! Here are some problems you might want to review today:\n".to_string(),
    }
}

fn item_line(item: &TrackedItem) -> String {
    let mut line = format!(
        "- {} (Solved: {})",
        truncate_to(&item.name, NAME_LIMIT),
        item.solved_at.format("%Y-%m-%d")
    );
    // a cut link is useless, so long ones are dropped
    if let Some(link) = item.link.as_deref().filter(|l| l.len() <= LINK_LIMIT) {
        line.push_str(&format!(" - <{link}>"));
    }
    line.push('\n');
    line
}

fn more_line(remaining: usize) -> String {
    let noun = if remaining == 1 { "problem" } else { "problems" };
    format!("...and {remaining} more {noun} waiting for a later reminder.\n")
}

/// Build the reminder for `items`, which must already be in due order.
///
/// Returns `None` when there is nothing to remind about.
pub fn compose_reminder(
    mention: Option<&str>,
    items: &[TrackedItem],
    max_items: usize,
) -> Option<ReminderMessage> {
    if items.is_empty() {
        return None;
    }

    let mut text = header(mention);
    let reserved = FOOTER.len() + more_line(items.len()).len();
    let mut item_ids = Vec::new();

    for item in items.iter().take(max_items.max(1)) {
        let line = item_line(item);
        if !item_ids.is_empty() && text.len() + line.len() + reserved > MESSAGE_LIMIT {
            break;
        }
        text.push_str(&line);
        item_ids.push(item.id);
    }

    let remaining = items.len() - item_ids.len();
    if remaining > 0 {
        text.push_str(&more_line(remaining));
    }
    text.push_str(FOOTER);

    Some(ReminderMessage {
        text,
        item_ids,
        remaining,
    })
}
