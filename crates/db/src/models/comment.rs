//! Comment model and DTOs.

use retro_core::types::{DbId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A comment joined with its author's profile.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Comment {
    pub id: DbId,
    pub card_id: DbId,
    pub comment_text: String,
    pub user_id: UserId,
    pub user_name: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for adding a comment to a card.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub card_id: DbId,
    pub comment_text: String,
    pub user_id: UserId,
}
