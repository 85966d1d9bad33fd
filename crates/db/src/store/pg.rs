use async_trait::async_trait;
use retro_core::board::{DEFAULT_CARD_TEXT, DEFAULT_COLUMN_NAME};
use retro_core::error::CoreError;
use retro_core::types::{DbId, RetroId, UserId};

use super::{BoardStore, StoreResult};
use crate::models::card::{Card, CardRemoval};
use crate::models::column::BoardColumn;
use crate::models::comment::{Comment, CreateComment};
use crate::models::retro::Retro;
use crate::repositories::{CardRepo, ColumnRepo, CommentRepo, RetroRepo};
use crate::DbPool;

/// [`BoardStore`] backed by Postgres.
///
/// Cheap to clone; the pool is reference-counted.
#[derive(Clone)]
pub struct PgBoardStore {
    pool: DbPool,
}

impl PgBoardStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BoardStore for PgBoardStore {
    async fn health_check(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }

    async fn find_retro(&self, retro_id: RetroId) -> StoreResult<Option<Retro>> {
        Ok(RetroRepo::find_by_id(&self.pool, retro_id).await?)
    }

    async fn create_column(&self, retro_id: RetroId) -> StoreResult<BoardColumn> {
        ColumnRepo::create(&self.pool, retro_id, DEFAULT_COLUMN_NAME)
            .await?
            .ok_or_else(|| CoreError::not_found("Retro", retro_id).into())
    }

    async fn rename_column(
        &self,
        retro_id: RetroId,
        column_id: DbId,
        column_name: &str,
    ) -> StoreResult<BoardColumn> {
        ColumnRepo::rename(&self.pool, retro_id, column_id, column_name)
            .await?
            .ok_or_else(|| CoreError::not_found("Column", column_id).into())
    }

    async fn delete_column(&self, retro_id: RetroId, column_id: DbId) -> StoreResult<Vec<DbId>> {
        let card_ids = ColumnRepo::delete_with_cards(&self.pool, retro_id, column_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Column", column_id))?;
        tracing::debug!(column_id, cards = card_ids.len(), "Column deleted with its cards");
        Ok(card_ids)
    }

    async fn find_column(&self, column_id: DbId) -> StoreResult<Option<BoardColumn>> {
        Ok(ColumnRepo::find_by_id(&self.pool, column_id).await?)
    }

    async fn list_columns(&self, retro_id: RetroId) -> StoreResult<Vec<BoardColumn>> {
        Ok(ColumnRepo::list_by_retro(&self.pool, retro_id).await?)
    }

    async fn find_column_for_card(&self, card_id: DbId) -> StoreResult<Option<BoardColumn>> {
        Ok(ColumnRepo::find_containing_card(&self.pool, card_id).await?)
    }

    async fn create_card(&self, column_id: DbId, user_id: UserId) -> StoreResult<DbId> {
        CardRepo::create_in_column(&self.pool, column_id, user_id, DEFAULT_CARD_TEXT)
            .await?
            .ok_or_else(|| CoreError::not_found("Column", column_id).into())
    }

    async fn delete_card(&self, card_id: DbId, column_id: DbId) -> StoreResult<()> {
        match CardRepo::delete_from_column(&self.pool, card_id, column_id).await? {
            CardRemoval::Removed => Ok(()),
            CardRemoval::AlreadyAbsent => {
                tracing::debug!(card_id, column_id, "Card already deleted");
                Ok(())
            }
            CardRemoval::NotInColumn => Err(CoreError::Conflict(format!(
                "Card {card_id} is not a member of column {column_id}"
            ))
            .into()),
        }
    }

    async fn find_card(&self, card_id: DbId) -> StoreResult<Option<Card>> {
        Ok(CardRepo::find_by_id(&self.pool, card_id).await?)
    }

    async fn update_card_text(&self, card_id: DbId, card_text: &str) -> StoreResult<Card> {
        CardRepo::update_text(&self.pool, card_id, card_text)
            .await?
            .ok_or_else(|| CoreError::not_found("Card", card_id).into())
    }

    async fn cards_by_ids(&self, card_ids: &[DbId]) -> StoreResult<Vec<Card>> {
        Ok(CardRepo::list_by_ids(&self.pool, card_ids).await?)
    }

    async fn add_comment(
        &self,
        card_id: DbId,
        comment_text: &str,
        user_id: UserId,
    ) -> StoreResult<Comment> {
        let input = CreateComment {
            card_id,
            comment_text: comment_text.to_string(),
            user_id,
        };
        CommentRepo::create(&self.pool, &input)
            .await?
            .ok_or_else(|| CoreError::not_found("Card", card_id).into())
    }

    async fn edit_comment_text(
        &self,
        comment_id: DbId,
        comment_text: &str,
    ) -> StoreResult<Comment> {
        CommentRepo::update_text(&self.pool, comment_id, comment_text)
            .await?
            .ok_or_else(|| CoreError::not_found("Comment", comment_id).into())
    }

    async fn remove_comment(&self, comment_id: DbId) -> StoreResult<()> {
        if CommentRepo::delete(&self.pool, comment_id).await? {
            Ok(())
        } else {
            Err(CoreError::not_found("Comment", comment_id).into())
        }
    }

    async fn find_comment(&self, comment_id: DbId) -> StoreResult<Option<Comment>> {
        Ok(CommentRepo::find_by_id(&self.pool, comment_id).await?)
    }

    async fn list_comments_for_card(&self, card_id: DbId) -> StoreResult<Vec<Comment>> {
        Ok(CommentRepo::list_by_card(&self.pool, card_id).await?)
    }

    async fn comments_by_cards(&self, card_ids: &[DbId]) -> StoreResult<Vec<Comment>> {
        Ok(CommentRepo::list_by_cards(&self.pool, card_ids).await?)
    }
}
