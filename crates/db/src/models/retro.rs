//! Retro session model.

use retro_core::types::{RetroId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `retros` table. Created outside this service.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Retro {
    pub id: RetroId,
    pub title: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
