use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use retro_core::board::{DEFAULT_CARD_TEXT, DEFAULT_COLUMN_NAME};
use retro_core::error::CoreError;
use retro_core::types::{DbId, RetroId, UserId};
use tokio::sync::Mutex;

use super::{BoardStore, StoreResult};
use crate::models::card::Card;
use crate::models::column::BoardColumn;
use crate::models::comment::Comment;
use crate::models::retro::Retro;

/// In-memory [`BoardStore`].
///
/// All tables sit behind one mutex, so every operation is its own
/// serializable transaction. Data is lost when the process exits.
#[derive(Default)]
pub struct MemoryBoardStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    retros: HashMap<RetroId, Retro>,
    user_names: HashMap<UserId, String>,
    columns: BTreeMap<DbId, BoardColumn>,
    /// Stored without display attributes; joined on read.
    cards: BTreeMap<DbId, Card>,
    comments: BTreeMap<DbId, Comment>,
    column_seq: DbId,
    card_seq: DbId,
    comment_seq: DbId,
}

impl Tables {
    fn next(seq: &mut DbId) -> DbId {
        *seq += 1;
        *seq
    }

    fn card_view(&self, card: &Card) -> Card {
        Card {
            user_name: self.user_names.get(&card.user_id).cloned(),
            ..card.clone()
        }
    }

    fn comment_view(&self, comment: &Comment) -> Comment {
        Comment {
            user_name: self.user_names.get(&comment.user_id).cloned(),
            ..comment.clone()
        }
    }
}

impl MemoryBoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a retro session. Sessions are provisioned outside the realtime
    /// server; this exists for fixtures and local development.
    pub async fn insert_retro(&self, title: &str) -> Retro {
        let now = chrono::Utc::now();
        let retro = Retro {
            id: uuid::Uuid::new_v4(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.tables
            .lock()
            .await
            .retros
            .insert(retro.id, retro.clone());
        retro
    }

    /// Register a display name for a user (the `user_profiles` join).
    pub async fn set_user_name(&self, user_id: UserId, user_name: &str) {
        self.tables
            .lock()
            .await
            .user_names
            .insert(user_id, user_name.to_string());
    }

    /// Number of card rows, regardless of membership.
    pub async fn card_count(&self) -> usize {
        self.tables.lock().await.cards.len()
    }

    /// Number of comment rows.
    pub async fn comment_count(&self) -> usize {
        self.tables.lock().await.comments.len()
    }
}

#[async_trait]
impl BoardStore for MemoryBoardStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_retro(&self, retro_id: RetroId) -> StoreResult<Option<Retro>> {
        Ok(self.tables.lock().await.retros.get(&retro_id).cloned())
    }

    async fn create_column(&self, retro_id: RetroId) -> StoreResult<BoardColumn> {
        let mut t = self.tables.lock().await;
        if !t.retros.contains_key(&retro_id) {
            return Err(CoreError::not_found("Retro", retro_id).into());
        }
        let now = chrono::Utc::now();
        let column = BoardColumn {
            id: Tables::next(&mut t.column_seq),
            retro_id,
            column_name: DEFAULT_COLUMN_NAME.to_string(),
            card_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        t.columns.insert(column.id, column.clone());
        Ok(column)
    }

    async fn rename_column(
        &self,
        retro_id: RetroId,
        column_id: DbId,
        column_name: &str,
    ) -> StoreResult<BoardColumn> {
        let mut t = self.tables.lock().await;
        let column = t
            .columns
            .get_mut(&column_id)
            .filter(|c| c.retro_id == retro_id)
            .ok_or_else(|| CoreError::not_found("Column", column_id))?;
        column.column_name = column_name.to_string();
        column.updated_at = chrono::Utc::now();
        Ok(column.clone())
    }

    async fn delete_column(&self, retro_id: RetroId, column_id: DbId) -> StoreResult<Vec<DbId>> {
        let mut t = self.tables.lock().await;
        let owned = t
            .columns
            .get(&column_id)
            .is_some_and(|c| c.retro_id == retro_id);
        if !owned {
            return Err(CoreError::not_found("Column", column_id).into());
        }
        let column = t
            .columns
            .remove(&column_id)
            .ok_or_else(|| CoreError::not_found("Column", column_id))?;
        for card_id in &column.card_ids {
            t.cards.remove(card_id);
        }
        t.comments
            .retain(|_, comment| !column.card_ids.contains(&comment.card_id));
        Ok(column.card_ids)
    }

    async fn find_column(&self, column_id: DbId) -> StoreResult<Option<BoardColumn>> {
        Ok(self.tables.lock().await.columns.get(&column_id).cloned())
    }

    async fn list_columns(&self, retro_id: RetroId) -> StoreResult<Vec<BoardColumn>> {
        Ok(self
            .tables
            .lock()
            .await
            .columns
            .values()
            .filter(|c| c.retro_id == retro_id)
            .cloned()
            .collect())
    }

    async fn find_column_for_card(&self, card_id: DbId) -> StoreResult<Option<BoardColumn>> {
        Ok(self
            .tables
            .lock()
            .await
            .columns
            .values()
            .find(|c| c.card_ids.contains(&card_id))
            .cloned())
    }

    async fn create_card(&self, column_id: DbId, user_id: UserId) -> StoreResult<DbId> {
        let mut t = self.tables.lock().await;
        if !t.columns.contains_key(&column_id) {
            return Err(CoreError::not_found("Column", column_id).into());
        }
        let now = chrono::Utc::now();
        let card_id = Tables::next(&mut t.card_seq);
        t.cards.insert(
            card_id,
            Card {
                id: card_id,
                card_text: DEFAULT_CARD_TEXT.to_string(),
                user_id,
                user_name: None,
                created_at: now,
                updated_at: now,
            },
        );
        if let Some(column) = t.columns.get_mut(&column_id) {
            column.card_ids.push(card_id);
            column.updated_at = now;
        }
        Ok(card_id)
    }

    async fn delete_card(&self, card_id: DbId, column_id: DbId) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        let listed = t
            .columns
            .get(&column_id)
            .is_some_and(|c| c.card_ids.contains(&card_id));
        if !t.cards.contains_key(&card_id) {
            if listed {
                if let Some(column) = t.columns.get_mut(&column_id) {
                    column.card_ids.retain(|id| *id != card_id);
                }
            }
            return Ok(());
        }
        if !listed {
            return Err(CoreError::Conflict(format!(
                "Card {card_id} is not a member of column {column_id}"
            ))
            .into());
        }
        t.cards.remove(&card_id);
        t.comments.retain(|_, comment| comment.card_id != card_id);
        if let Some(column) = t.columns.get_mut(&column_id) {
            column.card_ids.retain(|id| *id != card_id);
            column.updated_at = chrono::Utc::now();
        }
        Ok(())
    }

    async fn find_card(&self, card_id: DbId) -> StoreResult<Option<Card>> {
        let t = self.tables.lock().await;
        Ok(t.cards.get(&card_id).map(|card| t.card_view(card)))
    }

    async fn update_card_text(&self, card_id: DbId, card_text: &str) -> StoreResult<Card> {
        let mut t = self.tables.lock().await;
        let card = t
            .cards
            .get_mut(&card_id)
            .ok_or_else(|| CoreError::not_found("Card", card_id))?;
        card.card_text = card_text.to_string();
        card.updated_at = chrono::Utc::now();
        let card = card.clone();
        Ok(t.card_view(&card))
    }

    async fn cards_by_ids(&self, card_ids: &[DbId]) -> StoreResult<Vec<Card>> {
        let t = self.tables.lock().await;
        Ok(card_ids
            .iter()
            .filter_map(|id| t.cards.get(id))
            .map(|card| t.card_view(card))
            .collect())
    }

    async fn add_comment(
        &self,
        card_id: DbId,
        comment_text: &str,
        user_id: UserId,
    ) -> StoreResult<Comment> {
        let mut t = self.tables.lock().await;
        if !t.cards.contains_key(&card_id) {
            return Err(CoreError::not_found("Card", card_id).into());
        }
        let now = chrono::Utc::now();
        let comment = Comment {
            id: Tables::next(&mut t.comment_seq),
            card_id,
            comment_text: comment_text.to_string(),
            user_id,
            user_name: None,
            created_at: now,
            updated_at: now,
        };
        t.comments.insert(comment.id, comment.clone());
        Ok(t.comment_view(&comment))
    }

    async fn edit_comment_text(
        &self,
        comment_id: DbId,
        comment_text: &str,
    ) -> StoreResult<Comment> {
        let mut t = self.tables.lock().await;
        let comment = t
            .comments
            .get_mut(&comment_id)
            .ok_or_else(|| CoreError::not_found("Comment", comment_id))?;
        comment.comment_text = comment_text.to_string();
        comment.updated_at = chrono::Utc::now();
        let comment = comment.clone();
        Ok(t.comment_view(&comment))
    }

    async fn remove_comment(&self, comment_id: DbId) -> StoreResult<()> {
        self.tables
            .lock()
            .await
            .comments
            .remove(&comment_id)
            .map(|_| ())
            .ok_or_else(|| CoreError::not_found("Comment", comment_id).into())
    }

    async fn find_comment(&self, comment_id: DbId) -> StoreResult<Option<Comment>> {
        let t = self.tables.lock().await;
        Ok(t.comments.get(&comment_id).map(|c| t.comment_view(c)))
    }

    async fn list_comments_for_card(&self, card_id: DbId) -> StoreResult<Vec<Comment>> {
        self.comments_by_cards(&[card_id]).await
    }

    async fn comments_by_cards(&self, card_ids: &[DbId]) -> StoreResult<Vec<Comment>> {
        let t = self.tables.lock().await;
        Ok(t.comments
            .values()
            .filter(|c| card_ids.contains(&c.card_id))
            .map(|c| t.comment_view(c))
            .collect())
    }
}
