//! Board constants and validation rules.
//!
//! Lives in `core` so that the repositories (which insert placeholder rows)
//! and the WebSocket gateway (which validates client payloads) share one
//! definition of what a well-formed column name, card or comment is.

// ---------------------------------------------------------------------------
// Placeholder content
// ---------------------------------------------------------------------------

/// Text given to a freshly created card until someone edits it.
pub const DEFAULT_CARD_TEXT: &str = "New Card";

/// Name given to a freshly created column.
pub const DEFAULT_COLUMN_NAME: &str = "New Column";

// ---------------------------------------------------------------------------
// Length limits
// ---------------------------------------------------------------------------

/// Maximum column name length in characters.
pub const MAX_COLUMN_NAME_LEN: usize = 100;

/// Maximum card text length in characters.
pub const MAX_CARD_TEXT_LEN: usize = 2_000;

/// Maximum comment text length in characters.
pub const MAX_COMMENT_TEXT_LEN: usize = 2_000;

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Validate a column name. Must be non-blank and within
/// [`MAX_COLUMN_NAME_LEN`] characters.
pub fn validate_column_name(name: &str) -> Result<(), String> {
    validate_text("Column name", name, MAX_COLUMN_NAME_LEN, false)
}

/// Validate card text. Empty text is allowed (a user may clear a card), but
/// the length is capped at [`MAX_CARD_TEXT_LEN`].
pub fn validate_card_text(text: &str) -> Result<(), String> {
    validate_text("Card text", text, MAX_CARD_TEXT_LEN, true)
}

/// Validate comment text. Must be non-blank and within
/// [`MAX_COMMENT_TEXT_LEN`] characters.
pub fn validate_comment_text(text: &str) -> Result<(), String> {
    validate_text("Comment text", text, MAX_COMMENT_TEXT_LEN, false)
}

fn validate_text(label: &str, value: &str, max_len: usize, allow_blank: bool) -> Result<(), String> {
    if !allow_blank && value.trim().is_empty() {
        return Err(format!("{label} must not be empty"));
    }
    let len = value.chars().count();
    if len > max_len {
        return Err(format!(
            "{label} must be at most {max_len} characters, got {len}"
        ));
    }
    Ok(())
}
