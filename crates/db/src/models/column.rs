//! Column model.

use retro_core::types::{DbId, RetroId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `board_columns` table.
///
/// `card_ids` is the column's ordered card membership. A card belongs to
/// exactly the one column whose list contains it.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct BoardColumn {
    pub id: DbId,
    pub retro_id: RetroId,
    pub column_name: String,
    pub card_ids: Vec<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
