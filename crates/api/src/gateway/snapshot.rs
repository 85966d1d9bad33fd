//! Read assembly for a whole session.

use retro_core::error::CoreError;
use retro_core::types::RetroId;
use retro_db::models::card::Card;
use retro_db::models::column::BoardColumn;
use retro_db::models::comment::Comment;
use retro_db::models::retro::Retro;
use retro_db::BoardStore;
use serde::Serialize;

use crate::error::AppResult;

/// Everything persisted for one session: the payload of `initRetro` and of
/// the HTTP snapshot route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetroSnapshot {
    pub retro: Retro,
    /// Columns in display order.
    pub columns: Vec<BoardColumn>,
    /// Cards reached through the columns, in column then `card_ids` order.
    pub cards: Vec<Card>,
    /// Comments of those cards, oldest first.
    pub comments: Vec<Comment>,
}

/// Load a session snapshot by id. Fails with `NotFound` if the retro does
/// not exist.
pub async fn load_snapshot(store: &dyn BoardStore, retro_id: RetroId) -> AppResult<RetroSnapshot> {
    let retro = store
        .find_retro(retro_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Retro", retro_id))?;
    assemble(store, retro).await
}

/// Assemble a snapshot around an already loaded retro row.
///
/// Columns are read once and cards and comments are looked up by the card
/// ids that read lists. The reads share no transaction: a card removed
/// between them stays in its column's `card_ids` but is missing from
/// `cards`. The `cardDeleted` refresh for that removal follows the snapshot
/// and corrects the column.
pub async fn assemble(store: &dyn BoardStore, retro: Retro) -> AppResult<RetroSnapshot> {
    let columns = store.list_columns(retro.id).await?;
    let card_ids: Vec<_> = columns
        .iter()
        .flat_map(|column| column.card_ids.iter().copied())
        .collect();
    let cards = store.cards_by_ids(&card_ids).await?;
    let comments = store.comments_by_cards(&card_ids).await?;

    Ok(RetroSnapshot {
        retro,
        columns,
        cards,
        comments,
    })
}
