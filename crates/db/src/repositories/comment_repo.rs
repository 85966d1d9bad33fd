//! Repository for the `comments` table.

use retro_core::types::DbId;
use sqlx::PgPool;

use crate::models::comment::{Comment, CreateComment};

/// Comment columns joined with the author's display name.
const SELECT_COMMENT: &str = "SELECT m.id, m.card_id, m.comment_text, m.user_id, p.user_name, \
    m.created_at, m.updated_at \
    FROM comments m LEFT JOIN user_profiles p ON p.user_id = m.user_id";

/// Provides CRUD operations for comments.
pub struct CommentRepo;

impl CommentRepo {
    /// Insert a comment on an existing card.
    ///
    /// Returns `None` if the card does not exist.
    pub async fn create(
        pool: &PgPool,
        input: &CreateComment,
    ) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            "WITH inserted AS (
                INSERT INTO comments (card_id, comment_text, user_id)
                SELECT $1, $2, $3 WHERE EXISTS (SELECT 1 FROM cards WHERE id = $1)
                RETURNING id, card_id, comment_text, user_id, created_at, updated_at
             )
             SELECT i.id, i.card_id, i.comment_text, i.user_id, p.user_name,
                    i.created_at, i.updated_at
             FROM inserted i LEFT JOIN user_profiles p ON p.user_id = i.user_id",
        )
        .bind(input.card_id)
        .bind(&input.comment_text)
        .bind(input.user_id)
        .fetch_optional(pool)
        .await
    }

    /// Find a comment by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Comment>, sqlx::Error> {
        let query = format!("{SELECT_COMMENT} WHERE m.id = $1");
        sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a card's comments, oldest first.
    pub async fn list_by_card(pool: &PgPool, card_id: DbId) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!("{SELECT_COMMENT} WHERE m.card_id = $1 ORDER BY m.id ASC");
        sqlx::query_as::<_, Comment>(&query)
            .bind(card_id)
            .fetch_all(pool)
            .await
    }

    /// List the comments of every card in `card_ids`, oldest first.
    pub async fn list_by_cards(
        pool: &PgPool,
        card_ids: &[DbId],
    ) -> Result<Vec<Comment>, sqlx::Error> {
        if card_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!("{SELECT_COMMENT} WHERE m.card_id = ANY($1) ORDER BY m.id ASC");
        sqlx::query_as::<_, Comment>(&query)
            .bind(card_ids)
            .fetch_all(pool)
            .await
    }

    /// Replace a comment's text. Returns `None` if the comment does not exist.
    pub async fn update_text(
        pool: &PgPool,
        id: DbId,
        comment_text: &str,
    ) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            "WITH updated AS (
                UPDATE comments SET comment_text = $2, updated_at = NOW()
                WHERE id = $1
                RETURNING id, card_id, comment_text, user_id, created_at, updated_at
             )
             SELECT u.id, u.card_id, u.comment_text, u.user_id, p.user_name,
                    u.created_at, u.updated_at
             FROM updated u LEFT JOIN user_profiles p ON p.user_id = u.user_id",
        )
        .bind(id)
        .bind(comment_text)
        .fetch_optional(pool)
        .await
    }

    /// Delete a comment. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
