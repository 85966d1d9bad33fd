//! Repository for the `retros` table (read-only).

use retro_core::types::RetroId;
use sqlx::PgPool;

use crate::models::retro::Retro;

/// Provides lookups for retro sessions.
pub struct RetroRepo;

impl RetroRepo {
    /// Find a retro by its ID.
    pub async fn find_by_id(pool: &PgPool, id: RetroId) -> Result<Option<Retro>, sqlx::Error> {
        sqlx::query_as::<_, Retro>(
            "SELECT id, title, created_at, updated_at FROM retros WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
