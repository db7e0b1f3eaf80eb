//! Discord message size utilities
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Generalize truncation to arbitrary limits for reminder lines
//! - 1.0.0: Message limit and truncation helpers

/// Discord message content limit
pub const MESSAGE_LIMIT: usize = 2000;

const ELLIPSIS: &str = "...";

/// Truncate text to at most `max_bytes`, adding an ellipsis if anything was cut.
///
/// Never splits a UTF-8 character.
pub fn truncate_to(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    if max_bytes <= ELLIPSIS.len() {
        return ELLIPSIS[..max_bytes].to_string();
    }

    // Find a safe UTF-8 boundary
    let mut end = max_bytes - ELLIPSIS.len();
    while !text.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    format!("{}{ELLIPSIS}", &text[..end])
}
