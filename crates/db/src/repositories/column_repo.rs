//! Repository for the `board_columns` table.

use retro_core::types::{DbId, RetroId};
use sqlx::PgPool;

use crate::models::column::BoardColumn;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, retro_id, column_name, card_ids, created_at, updated_at";

/// Provides CRUD operations for columns.
pub struct ColumnRepo;

impl ColumnRepo {
    /// Insert an empty column into a retro, returning the created row.
    ///
    /// Returns `None` if the retro does not exist.
    pub async fn create(
        pool: &PgPool,
        retro_id: RetroId,
        column_name: &str,
    ) -> Result<Option<BoardColumn>, sqlx::Error> {
        let query = format!(
            "INSERT INTO board_columns (retro_id, column_name)
             SELECT $1, $2 WHERE EXISTS (SELECT 1 FROM retros WHERE id = $1)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BoardColumn>(&query)
            .bind(retro_id)
            .bind(column_name)
            .fetch_optional(pool)
            .await
    }

    /// Find a column by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<BoardColumn>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM board_columns WHERE id = $1");
        sqlx::query_as::<_, BoardColumn>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a retro's columns in creation order.
    pub async fn list_by_retro(
        pool: &PgPool,
        retro_id: RetroId,
    ) -> Result<Vec<BoardColumn>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM board_columns WHERE retro_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, BoardColumn>(&query)
            .bind(retro_id)
            .fetch_all(pool)
            .await
    }

    /// Find the column whose `card_ids` contains the given card.
    pub async fn find_containing_card(
        pool: &PgPool,
        card_id: DbId,
    ) -> Result<Option<BoardColumn>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM board_columns WHERE $1 = ANY(card_ids) ORDER BY id ASC LIMIT 1"
        );
        sqlx::query_as::<_, BoardColumn>(&query)
            .bind(card_id)
            .fetch_optional(pool)
            .await
    }

    /// Rename a column belonging to `retro_id`.
    ///
    /// Returns `None` if no such column exists in that retro.
    pub async fn rename(
        pool: &PgPool,
        retro_id: RetroId,
        id: DbId,
        column_name: &str,
    ) -> Result<Option<BoardColumn>, sqlx::Error> {
        let query = format!(
            "UPDATE board_columns SET column_name = $3, updated_at = NOW()
             WHERE id = $1 AND retro_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BoardColumn>(&query)
            .bind(id)
            .bind(retro_id)
            .bind(column_name)
            .fetch_optional(pool)
            .await
    }

    /// Delete a column and every card it lists, in one transaction.
    ///
    /// Comments go with their cards through `ON DELETE CASCADE`. Returns the
    /// ids of the deleted cards, or `None` if the column does not exist in
    /// that retro.
    pub async fn delete_with_cards(
        pool: &PgPool,
        retro_id: RetroId,
        id: DbId,
    ) -> Result<Option<Vec<DbId>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let removed: Option<(Vec<DbId>,)> = sqlx::query_as(
            "DELETE FROM board_columns WHERE id = $1 AND retro_id = $2 RETURNING card_ids",
        )
        .bind(id)
        .bind(retro_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((card_ids,)) = removed else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM cards WHERE id = ANY($1)")
            .bind(&card_ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(card_ids))
    }
}
