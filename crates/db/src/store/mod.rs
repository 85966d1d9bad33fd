//! The storage seam between the realtime server and the database.
//!
//! [`BoardStore`] exposes every read and mutation the gateway performs.
//! Membership-changing operations (`create_card`, `delete_card`,
//! `delete_column`) are atomic in every implementation: a caller can never
//! observe a card row without its column entry or the reverse.
//!
//! Two implementations ship with the crate:
//!
//! - [`PgBoardStore`]: backed by the repositories and Postgres transactions.
//! - [`MemoryBoardStore`]: a single-lock in-memory store for tests and local
//!   development.

use async_trait::async_trait;
use retro_core::types::{DbId, RetroId, UserId};

use crate::models::card::Card;
use crate::models::column::BoardColumn;
use crate::models::comment::Comment;
use crate::models::retro::Retro;
use crate::DbError;

mod memory;
mod pg;

pub use memory::MemoryBoardStore;
pub use pg::PgBoardStore;

/// Convenience alias for store results.
pub type StoreResult<T> = Result<T, DbError>;

#[async_trait]
pub trait BoardStore: Send + Sync {
    // ========================================================================
    // HEALTH
    // ========================================================================

    /// Confirm the backing store is reachable.
    async fn health_check(&self) -> StoreResult<()>;

    // ========================================================================
    // RETROS
    // ========================================================================

    /// Find a retro session by ID.
    async fn find_retro(&self, retro_id: RetroId) -> StoreResult<Option<Retro>>;

    // ========================================================================
    // COLUMNS
    // ========================================================================

    /// Create an empty column at the end of the retro's column list.
    ///
    /// Fails with `NotFound` if the retro does not exist.
    async fn create_column(&self, retro_id: RetroId) -> StoreResult<BoardColumn>;

    /// Rename a column of the given retro, returning the updated row.
    async fn rename_column(
        &self,
        retro_id: RetroId,
        column_id: DbId,
        column_name: &str,
    ) -> StoreResult<BoardColumn>;

    /// Delete a column together with every card it lists (and their
    /// comments). Returns the ids of the deleted cards.
    async fn delete_column(&self, retro_id: RetroId, column_id: DbId) -> StoreResult<Vec<DbId>>;

    async fn find_column(&self, column_id: DbId) -> StoreResult<Option<BoardColumn>>;

    /// List a retro's columns in display (creation) order.
    async fn list_columns(&self, retro_id: RetroId) -> StoreResult<Vec<BoardColumn>>;

    /// Find the column whose `card_ids` lists the card.
    async fn find_column_for_card(&self, card_id: DbId) -> StoreResult<Option<BoardColumn>>;

    // ========================================================================
    // CARDS
    // ========================================================================

    /// Create a placeholder card owned by `user_id` and append it to the
    /// column's `card_ids`. Fails with `NotFound` if the column is missing.
    async fn create_card(&self, column_id: DbId, user_id: UserId) -> StoreResult<DbId>;

    /// Delete a card and drop it from the named column.
    ///
    /// Idempotent: a card that is already gone is a no-op. A card that exists
    /// in some other column fails with `Conflict` and nothing changes.
    async fn delete_card(&self, card_id: DbId, column_id: DbId) -> StoreResult<()>;

    async fn find_card(&self, card_id: DbId) -> StoreResult<Option<Card>>;

    /// Replace a card's text (last write wins).
    async fn update_card_text(&self, card_id: DbId, card_text: &str) -> StoreResult<Card>;

    /// Fetch cards by id in the order given, skipping unknown ids.
    async fn cards_by_ids(&self, card_ids: &[DbId]) -> StoreResult<Vec<Card>>;

    // ========================================================================
    // COMMENTS
    // ========================================================================

    /// Add a comment to an existing card.
    async fn add_comment(
        &self,
        card_id: DbId,
        comment_text: &str,
        user_id: UserId,
    ) -> StoreResult<Comment>;

    async fn edit_comment_text(&self, comment_id: DbId, comment_text: &str)
        -> StoreResult<Comment>;

    /// Delete a comment. Fails with `NotFound` if it does not exist.
    async fn remove_comment(&self, comment_id: DbId) -> StoreResult<()>;

    async fn find_comment(&self, comment_id: DbId) -> StoreResult<Option<Comment>>;

    async fn list_comments_for_card(&self, card_id: DbId) -> StoreResult<Vec<Comment>>;

    /// Comments of every card in `card_ids`, oldest first.
    async fn comments_by_cards(&self, card_ids: &[DbId]) -> StoreResult<Vec<Comment>>;

    // ========================================================================
    // DERIVED READS
    // ========================================================================

    /// Ordered card ids of one column. Fails with `NotFound` if the column
    /// is missing.
    async fn list_card_ids_for_column(&self, column_id: DbId) -> StoreResult<Vec<DbId>> {
        self.find_column(column_id)
            .await?
            .map(|column| column.card_ids)
            .ok_or_else(|| retro_core::error::CoreError::not_found("Column", column_id).into())
    }

    /// Cards of one column in display order.
    async fn list_cards_for_column(&self, column_id: DbId) -> StoreResult<Vec<Card>> {
        let card_ids = self.list_card_ids_for_column(column_id).await?;
        self.cards_by_ids(&card_ids).await
    }

    /// Every card id of a retro, reached through its columns.
    async fn list_card_ids_for_session(&self, retro_id: RetroId) -> StoreResult<Vec<DbId>> {
        let columns = self.list_columns(retro_id).await?;
        Ok(columns.into_iter().flat_map(|c| c.card_ids).collect())
    }

    /// Every card of a retro: the union over its columns of the cards each
    /// column lists. There is no direct retro-to-card index.
    async fn list_cards(&self, retro_id: RetroId) -> StoreResult<Vec<Card>> {
        let card_ids = self.list_card_ids_for_session(retro_id).await?;
        self.cards_by_ids(&card_ids).await
    }

    /// Every comment of a retro, reached through its cards.
    async fn list_comments_for_session(&self, retro_id: RetroId) -> StoreResult<Vec<Comment>> {
        let card_ids = self.list_card_ids_for_session(retro_id).await?;
        self.comments_by_cards(&card_ids).await
    }

    /// The retro a card belongs to, found through its owning column.
    async fn find_retro_for_card(&self, card_id: DbId) -> StoreResult<Option<RetroId>> {
        Ok(self
            .find_column_for_card(card_id)
            .await?
            .map(|column| column.retro_id))
    }
}
