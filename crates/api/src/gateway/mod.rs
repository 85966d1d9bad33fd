//! Mutation gateway: turns client intents into store calls and room
//! broadcasts.
//!
//! Every intent follows the same contract: validate the payload, run one
//! store mutation, then re-read the affected scope and broadcast it to the
//! session's room. A failure at any step before the broadcast is reported to
//! the originating connection only (`intentFailed`) and nothing is sent to
//! the room.

pub mod snapshot;

use std::future::Future;
use std::sync::Arc;

use retro_core::error::CoreError;
use retro_core::types::{DbId, RetroId};
use retro_db::BoardStore;

use crate::error::{AppError, AppResult};
use crate::ws::hub::{JoinOutcome, RoomHub};
use crate::ws::protocol::{
    AddCard, AddComment, ChangeCardText, ChangeCommentText, ClientIntent, ColumnRef, JoinRetro,
    RemoveCard, RemoveComment, RenameColumn, ServerEvent, SessionRef,
};

/// Dispatches [`ClientIntent`]s against a [`BoardStore`] and publishes the
/// resulting state through the [`RoomHub`].
pub struct Gateway {
    store: Arc<dyn BoardStore>,
    hub: Arc<RoomHub>,
}

impl Gateway {
    pub fn new(store: Arc<dyn BoardStore>, hub: Arc<RoomHub>) -> Self {
        Self { store, hub }
    }

    /// Decode and handle one inbound text frame.
    pub async fn handle_text(&self, conn_id: &str, text: &str) {
        match ClientIntent::parse(text) {
            Ok(intent) => self.handle_intent(conn_id, intent).await,
            Err(frame) => {
                let event = frame.event.clone();
                self.reject(conn_id, &event, AppError::Core(frame.into())).await;
            }
        }
    }

    /// Validate and dispatch one intent. Failures never propagate to the
    /// caller; they are logged and acknowledged to the originator.
    pub async fn handle_intent(&self, conn_id: &str, intent: ClientIntent) {
        let event = intent.name();
        tracing::debug!(conn_id = %conn_id, event, "Handling intent");

        let result = match intent.validate() {
            Ok(()) => self.dispatch(conn_id, intent).await,
            Err(e) => Err(e.into()),
        };

        if let Err(err) = result {
            self.reject(conn_id, event, err).await;
        }
    }

    /// Tear down a closed connection: leave every room and tell the
    /// remaining members.
    pub async fn disconnect(&self, conn_id: &str) {
        for (retro_id, user_id) in self.hub.remove(conn_id).await {
            self.hub
                .broadcast(retro_id, &ServerEvent::UserLeftRetro(user_id))
                .await;
        }
    }

    async fn dispatch(&self, conn_id: &str, intent: ClientIntent) -> AppResult<()> {
        match intent {
            ClientIntent::JoinRetro(p) => self.join_retro(conn_id, p).await,
            ClientIntent::LeaveRetro(p) => self.leave_retro(conn_id, p).await,
            ClientIntent::ColumnAdded(p) => self.column_added(p).await,
            ClientIntent::ColumnRenamed(p) => self.column_renamed(p).await,
            ClientIntent::ColumnDeleted(p) => self.column_deleted(p).await,
            ClientIntent::CardAdded(p) => self.card_added(p).await,
            ClientIntent::RemoveCard(p) => self.remove_card(p).await,
            ClientIntent::ChangeCardText(p) => self.change_card_text(p).await,
            ClientIntent::AddComment(p) => self.add_comment(p).await,
            ClientIntent::ChangeCommentText(p) => self.change_comment_text(p).await,
            ClientIntent::RemoveComment(p) => self.remove_comment(p).await,
        }
    }

    async fn reject(&self, conn_id: &str, event: &str, err: AppError) {
        if err.is_server_error() {
            tracing::error!(conn_id = %conn_id, event, error = %err, "Intent failed");
        } else {
            tracing::warn!(conn_id = %conn_id, event, error = %err, "Intent rejected");
        }

        let ack = ServerEvent::IntentFailed {
            event: event.to_string(),
            code: err.code().to_string(),
            message: err.public_message(),
        };
        self.hub.send_to(conn_id, &ack).await;
    }

    // ------------------------------------------------------------------
    // Presence
    // ------------------------------------------------------------------

    async fn join_retro(&self, conn_id: &str, p: JoinRetro) -> AppResult<()> {
        let retro = self
            .store
            .find_retro(p.session_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Retro", p.session_id))?;

        match self.hub.join(conn_id, retro.id, p.user_id).await {
            JoinOutcome::Joined => {
                tracing::info!(conn_id = %conn_id, retro_id = %retro.id, user_id = %p.user_id, "User joined retro");
                self.hub
                    .broadcast_except(retro.id, conn_id, &ServerEvent::UserJoinedRetro(p.user_id))
                    .await;
            }
            JoinOutcome::AlreadyJoined => {
                tracing::debug!(conn_id = %conn_id, retro_id = %retro.id, "Already in room, resending snapshot");
            }
            JoinOutcome::UnknownConnection => {
                return Err(CoreError::Transport(format!("Connection {conn_id} is closed")).into());
            }
        }

        // Hold the room lock so no refresh is published between reading the
        // snapshot and queueing it.
        let Some(lock) = self.hub.publish_lock(retro.id).await else {
            return Ok(());
        };
        let _guard = lock.lock().await;
        let snapshot = snapshot::assemble(self.store.as_ref(), retro).await?;
        self.hub
            .send_to(conn_id, &ServerEvent::InitRetro(snapshot))
            .await;
        Ok(())
    }

    async fn leave_retro(&self, conn_id: &str, p: SessionRef) -> AppResult<()> {
        match self.hub.leave(conn_id, p.session_id).await {
            Some(user_id) => {
                tracing::info!(conn_id = %conn_id, retro_id = %p.session_id, "User left retro");
                self.hub
                    .broadcast(p.session_id, &ServerEvent::UserLeftRetro(user_id))
                    .await;
            }
            None => {
                tracing::debug!(conn_id = %conn_id, retro_id = %p.session_id, "Leave for a room not joined");
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------------

    async fn column_added(&self, p: SessionRef) -> AppResult<()> {
        let column = self.store.create_column(p.session_id).await?;
        tracing::info!(retro_id = %p.session_id, column_id = column.id, "Column added");
        self.publish(p.session_id, self.column_list(p.session_id, column.id))
            .await;
        Ok(())
    }

    async fn column_renamed(&self, p: RenameColumn) -> AppResult<()> {
        let column = self
            .store
            .rename_column(p.session_id, p.column_id, &p.column_name)
            .await?;
        self.publish(p.session_id, async {
            let columns = self.store.list_columns(p.session_id).await?;
            Ok::<_, AppError>(ServerEvent::ColumnNameUpdated {
                column_id: column.id,
                column_name: column.column_name,
                columns,
            })
        })
        .await;
        Ok(())
    }

    async fn column_deleted(&self, p: ColumnRef) -> AppResult<()> {
        let removed = self.store.delete_column(p.session_id, p.column_id).await?;
        tracing::info!(
            retro_id = %p.session_id,
            column_id = p.column_id,
            cards = removed.len(),
            "Column deleted"
        );
        self.publish(p.session_id, self.column_list(p.session_id, p.column_id))
            .await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cards
    // ------------------------------------------------------------------

    async fn card_added(&self, p: AddCard) -> AppResult<()> {
        let retro_id = self.retro_for_column(p.column_id).await?;
        if retro_id != p.session_id {
            return Err(CoreError::not_found("Column", p.column_id).into());
        }

        let card_id = self.store.create_card(p.column_id, p.user_id).await?;
        tracing::info!(retro_id = %retro_id, column_id = p.column_id, card_id, "Card added");
        self.publish(retro_id, async {
            let column = self.column(p.column_id).await?;
            let cards = self.store.cards_by_ids(&column.card_ids).await?;
            Ok::<_, AppError>(ServerEvent::CardUpdated {
                column,
                cards,
                card_id,
            })
        })
        .await;
        Ok(())
    }

    async fn remove_card(&self, p: RemoveCard) -> AppResult<()> {
        // Resolve through the column: the card may already be gone.
        let retro_id = self.retro_for_column(p.column_id).await?;

        self.store.delete_card(p.card_id, p.column_id).await?;
        tracing::info!(retro_id = %retro_id, column_id = p.column_id, card_id = p.card_id, "Card removed");
        self.publish(retro_id, async {
            let column = self.column(p.column_id).await?;
            let cards = self.store.cards_by_ids(&column.card_ids).await?;
            Ok::<_, AppError>(ServerEvent::CardDeleted {
                card_id: p.card_id,
                column,
                cards,
            })
        })
        .await;
        Ok(())
    }

    async fn change_card_text(&self, p: ChangeCardText) -> AppResult<()> {
        let retro_id = self.retro_for_card(p.card_id).await?;

        self.store.update_card_text(p.card_id, &p.card_text).await?;
        self.publish(retro_id, async {
            let column = self
                .store
                .find_column_for_card(p.card_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Card", p.card_id))?;
            let cards = self.store.cards_by_ids(&column.card_ids).await?;
            Ok::<_, AppError>(ServerEvent::CardUpdated {
                column,
                cards,
                card_id: p.card_id,
            })
        })
        .await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    async fn add_comment(&self, p: AddComment) -> AppResult<()> {
        let retro_id = self.retro_for_card(p.card_id).await?;

        let comment = self
            .store
            .add_comment(p.card_id, &p.comment_text, p.user_id)
            .await?;
        tracing::info!(retro_id = %retro_id, card_id = p.card_id, comment_id = comment.id, "Comment added");
        self.publish(retro_id, async {
            let comments = self.store.list_comments_for_card(p.card_id).await?;
            Ok::<_, AppError>(ServerEvent::CommentAdded {
                card_id: p.card_id,
                comments,
            })
        })
        .await;
        Ok(())
    }

    async fn change_comment_text(&self, p: ChangeCommentText) -> AppResult<()> {
        let card_id = self.card_of_comment(p.comment_id).await?;
        let retro_id = self.retro_for_card(card_id).await?;

        self.store
            .edit_comment_text(p.comment_id, &p.comment_text)
            .await?;
        self.publish(retro_id, async {
            let comments = self.store.list_comments_for_card(card_id).await?;
            Ok::<_, AppError>(ServerEvent::CommentUpdated { card_id, comments })
        })
        .await;
        Ok(())
    }

    async fn remove_comment(&self, p: RemoveComment) -> AppResult<()> {
        let card_id = self.card_of_comment(p.comment_id).await?;
        let retro_id = self.retro_for_card(card_id).await?;

        self.store.remove_comment(p.comment_id).await?;
        tracing::info!(retro_id = %retro_id, comment_id = p.comment_id, "Comment removed");
        self.publish(retro_id, async {
            let comments = self.store.list_comments_for_card(card_id).await?;
            Ok::<_, AppError>(ServerEvent::CommentDeleted {
                comment_id: p.comment_id,
                card_id,
                comments,
            })
        })
        .await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Publishing and scope resolution
    // ------------------------------------------------------------------

    /// Re-read a scope and broadcast it to the room, holding the room's
    /// publish lock across both steps.
    ///
    /// `refresh` is not polled when the room is empty. The mutation has
    /// already committed when this runs, so a failed re-read is logged and
    /// the broadcast skipped rather than reported as a failed intent.
    async fn publish<F>(&self, retro_id: RetroId, refresh: F) -> usize
    where
        F: Future<Output = AppResult<ServerEvent>>,
    {
        let Some(lock) = self.hub.publish_lock(retro_id).await else {
            tracing::debug!(retro_id = %retro_id, "No members, skipping broadcast");
            return 0;
        };
        let _guard = lock.lock().await;

        match refresh.await {
            Ok(event) => self.hub.broadcast(retro_id, &event).await,
            Err(e) => {
                tracing::warn!(retro_id = %retro_id, error = %e, "Refresh after mutation failed, broadcast skipped");
                0
            }
        }
    }

    async fn column_list(&self, retro_id: RetroId, column_id: DbId) -> AppResult<ServerEvent> {
        let retro = self
            .store
            .find_retro(retro_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Retro", retro_id))?;
        let columns = self.store.list_columns(retro_id).await?;
        Ok(ServerEvent::ColumnUpdated {
            retro,
            columns,
            column_id,
        })
    }

    async fn column(&self, column_id: DbId) -> AppResult<retro_db::models::column::BoardColumn> {
        Ok(self
            .store
            .find_column(column_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Column", column_id))?)
    }

    async fn retro_for_column(&self, column_id: DbId) -> AppResult<RetroId> {
        Ok(self.column(column_id).await?.retro_id)
    }

    async fn retro_for_card(&self, card_id: DbId) -> AppResult<RetroId> {
        Ok(self
            .store
            .find_retro_for_card(card_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Card", card_id))?)
    }

    async fn card_of_comment(&self, comment_id: DbId) -> AppResult<DbId> {
        Ok(self
            .store
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Comment", comment_id))?
            .card_id)
    }
}
