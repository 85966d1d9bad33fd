//! Repository for the `cards` table and column membership.
//!
//! A card's column is never stored on the card. Membership lives in
//! `board_columns.card_ids`, so creating or deleting a card touches two
//! tables and always runs in one transaction. The list itself is only ever
//! changed with `array_append` / `array_remove` evaluated by Postgres; it is
//! never read into Rust, edited, and written back.

use retro_core::types::{DbId, UserId};
use sqlx::PgPool;

use crate::models::card::{Card, CardRemoval};

/// Card columns joined with the author's display name.
const SELECT_CARD: &str = "SELECT c.id, c.card_text, c.user_id, p.user_name, \
    c.created_at, c.updated_at \
    FROM cards c LEFT JOIN user_profiles p ON p.user_id = c.user_id";

/// Provides card operations that keep column membership consistent.
pub struct CardRepo;

impl CardRepo {
    /// Insert a card and append its id to the end of a column's `card_ids`.
    ///
    /// Returns `None` (and rolls back the insert) if the column does not
    /// exist.
    pub async fn create_in_column(
        pool: &PgPool,
        column_id: DbId,
        user_id: UserId,
        card_text: &str,
    ) -> Result<Option<DbId>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let (card_id,): (DbId,) =
            sqlx::query_as("INSERT INTO cards (card_text, user_id) VALUES ($1, $2) RETURNING id")
                .bind(card_text)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;

        let appended = sqlx::query(
            "UPDATE board_columns SET card_ids = array_append(card_ids, $2), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(column_id)
        .bind(card_id)
        .execute(&mut *tx)
        .await?;

        if appended.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(card_id))
    }

    /// Delete a card and remove its id from the named column, atomically.
    ///
    /// A card that no longer exists is a no-op. A card that exists but is not
    /// listed by `column_id` is left untouched ([`CardRemoval::NotInColumn`]).
    ///
    /// The column row is locked before the card row, the same order
    /// [`ColumnRepo::delete_with_cards`](super::ColumnRepo::delete_with_cards)
    /// uses.
    pub async fn delete_from_column(
        pool: &PgPool,
        card_id: DbId,
        column_id: DbId,
    ) -> Result<CardRemoval, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let detached = sqlx::query(
            "UPDATE board_columns SET card_ids = array_remove(card_ids, $2), updated_at = NOW() \
             WHERE id = $1 AND $2 = ANY(card_ids)",
        )
        .bind(column_id)
        .bind(card_id)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM cards WHERE id = $1")
            .bind(card_id)
            .execute(&mut *tx)
            .await?;

        let outcome = match (detached.rows_affected(), deleted.rows_affected()) {
            (_, 0) => CardRemoval::AlreadyAbsent,
            (0, _) => CardRemoval::NotInColumn,
            _ => CardRemoval::Removed,
        };

        if outcome == CardRemoval::NotInColumn {
            tx.rollback().await?;
        } else {
            // An absent card may still have left a dangling id behind; keep
            // the removal in that case.
            tx.commit().await?;
        }
        Ok(outcome)
    }

    /// Find a card by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Card>, sqlx::Error> {
        let query = format!("{SELECT_CARD} WHERE c.id = $1");
        sqlx::query_as::<_, Card>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Fetch the given cards, ordered as they appear in `ids`.
    ///
    /// Ids with no matching row are skipped.
    pub async fn list_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<Card>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "{SELECT_CARD} WHERE c.id = ANY($1) ORDER BY array_position($1::BIGINT[], c.id)"
        );
        sqlx::query_as::<_, Card>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Replace a card's text. Returns `None` if the card does not exist.
    pub async fn update_text(
        pool: &PgPool,
        id: DbId,
        card_text: &str,
    ) -> Result<Option<Card>, sqlx::Error> {
        sqlx::query_as::<_, Card>(
            "WITH updated AS (
                UPDATE cards SET card_text = $2, updated_at = NOW()
                WHERE id = $1
                RETURNING id, card_text, user_id, created_at, updated_at
             )
             SELECT u.id, u.card_text, u.user_id, p.user_name, u.created_at, u.updated_at
             FROM updated u LEFT JOIN user_profiles p ON p.user_id = u.user_id",
        )
        .bind(id)
        .bind(card_text)
        .fetch_optional(pool)
        .await
    }
}
