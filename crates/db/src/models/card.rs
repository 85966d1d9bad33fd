//! Card model and removal outcome.

use retro_core::types::{DbId, Timestamp, UserId};
use serde::Serialize;
use sqlx::FromRow;

/// A card joined with its author's profile.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Card {
    pub id: DbId,
    pub card_text: String,
    pub user_id: UserId,
    /// `None` when the author has no `user_profiles` row.
    pub user_name: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Result of removing a card from a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardRemoval {
    /// The card row was deleted and its id dropped from the column.
    Removed,
    /// No card with that id exists; nothing changed.
    AlreadyAbsent,
    /// The card exists but the named column does not list it. The
    /// transaction was rolled back.
    NotInColumn,
}
