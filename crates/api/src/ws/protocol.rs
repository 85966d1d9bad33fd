//! Typed wire protocol for the board WebSocket.
//!
//! Every frame in either direction is a JSON text message of the form
//! `{"event": "<name>", "payload": <value>}`. Client frames decode into the
//! closed [`ClientIntent`] set; server frames are built from [`ServerEvent`].

use axum::extract::ws::Message;
use retro_core::board::{validate_card_text, validate_column_name, validate_comment_text};
use retro_core::error::CoreError;
use retro_core::types::{DbId, RetroId, UserId};
use retro_db::models::card::Card;
use retro_db::models::column::BoardColumn;
use retro_db::models::comment::Comment;
use retro_db::models::retro::Retro;
use serde::{Deserialize, Serialize};

use crate::gateway::snapshot::RetroSnapshot;

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

/// `{user_id, session_id}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JoinRetro {
    pub user_id: UserId,
    #[serde(alias = "retro_id")]
    pub session_id: RetroId,
}

/// `{session_id}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionRef {
    #[serde(alias = "retro_id")]
    pub session_id: RetroId,
}

/// `{session_id, column_id, column_name}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenameColumn {
    #[serde(alias = "retro_id")]
    pub session_id: RetroId,
    pub column_id: DbId,
    pub column_name: String,
}

/// `{session_id, column_id}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnRef {
    #[serde(alias = "retro_id")]
    pub session_id: RetroId,
    pub column_id: DbId,
}

/// `{session_id, column_id, user_id}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddCard {
    #[serde(alias = "retro_id")]
    pub session_id: RetroId,
    pub column_id: DbId,
    pub user_id: UserId,
}

/// `{card_id, column_id}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoveCard {
    pub card_id: DbId,
    pub column_id: DbId,
}

/// `{card_id, card_text}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChangeCardText {
    pub card_id: DbId,
    pub card_text: String,
}

/// `{user_id, card_id, comment_text}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddComment {
    pub user_id: UserId,
    pub card_id: DbId,
    pub comment_text: String,
}

/// `{comment_id, comment_text}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChangeCommentText {
    pub comment_id: DbId,
    pub comment_text: String,
}

/// `{comment_id}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoveComment {
    pub comment_id: DbId,
}

/// A client-originated request, one variant per event name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ClientIntent {
    JoinRetro(JoinRetro),
    LeaveRetro(SessionRef),
    ColumnAdded(SessionRef),
    ColumnRenamed(RenameColumn),
    ColumnDeleted(ColumnRef),
    CardAdded(AddCard),
    RemoveCard(RemoveCard),
    ChangeCardText(ChangeCardText),
    AddComment(AddComment),
    ChangeCommentText(ChangeCommentText),
    RemoveComment(RemoveComment),
}

/// A text frame that could not be decoded into a [`ClientIntent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedFrame {
    /// The frame's `event` field, or `"unknown"` when it could not be read.
    pub event: String,
    pub reason: String,
}

impl From<MalformedFrame> for CoreError {
    fn from(frame: MalformedFrame) -> Self {
        CoreError::Validation(frame.reason)
    }
}

impl ClientIntent {
    /// Decode a text frame.
    pub fn parse(text: &str) -> Result<Self, MalformedFrame> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(|e| MalformedFrame {
            event: "unknown".to_string(),
            reason: format!("Invalid JSON: {e}"),
        })?;

        let event = value
            .get("event")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        serde_json::from_value(value).map_err(|e| MalformedFrame {
            reason: format!("Invalid '{event}' frame: {e}"),
            event,
        })
    }

    /// The wire name of this intent.
    pub fn name(&self) -> &'static str {
        match self {
            ClientIntent::JoinRetro(_) => "joinRetro",
            ClientIntent::LeaveRetro(_) => "leaveRetro",
            ClientIntent::ColumnAdded(_) => "columnAdded",
            ClientIntent::ColumnRenamed(_) => "columnRenamed",
            ClientIntent::ColumnDeleted(_) => "columnDeleted",
            ClientIntent::CardAdded(_) => "cardAdded",
            ClientIntent::RemoveCard(_) => "removeCard",
            ClientIntent::ChangeCardText(_) => "changeCardText",
            ClientIntent::AddComment(_) => "addComment",
            ClientIntent::ChangeCommentText(_) => "changeCommentText",
            ClientIntent::RemoveComment(_) => "removeComment",
        }
    }

    /// Check payload content beyond its shape (text limits, blank names).
    pub fn validate(&self) -> Result<(), CoreError> {
        let result = match self {
            ClientIntent::ColumnRenamed(p) => validate_column_name(&p.column_name),
            ClientIntent::ChangeCardText(p) => validate_card_text(&p.card_text),
            ClientIntent::AddComment(p) => validate_comment_text(&p.comment_text),
            ClientIntent::ChangeCommentText(p) => validate_comment_text(&p.comment_text),
            _ => Ok(()),
        };
        result.map_err(CoreError::Validation)
    }
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

/// An event pushed to one connection or a whole room.
///
/// Refresh events carry the full current state of the affected scope; a
/// client replaces its local copy wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Greeting sent once after the upgrade.
    Connected { conn_id: String },
    /// Full session state, sent to a connection that joined.
    InitRetro(RetroSnapshot),
    UserJoinedRetro(UserId),
    UserLeftRetro(UserId),
    /// The session's column list changed (added or deleted column).
    ColumnUpdated {
        retro: Retro,
        columns: Vec<BoardColumn>,
        column_id: DbId,
    },
    ColumnNameUpdated {
        column_id: DbId,
        column_name: String,
        columns: Vec<BoardColumn>,
    },
    /// A column's cards changed (added card or edited card text).
    CardUpdated {
        column: BoardColumn,
        cards: Vec<Card>,
        card_id: DbId,
    },
    CardDeleted {
        card_id: DbId,
        column: BoardColumn,
        cards: Vec<Card>,
    },
    CommentAdded { card_id: DbId, comments: Vec<Comment> },
    CommentUpdated { card_id: DbId, comments: Vec<Comment> },
    CommentDeleted {
        comment_id: DbId,
        card_id: DbId,
        comments: Vec<Comment>,
    },
    /// Point-to-point acknowledgment of a rejected intent.
    IntentFailed {
        event: String,
        code: String,
        message: String,
    },
}

impl ServerEvent {
    /// The wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::InitRetro(_) => "initRetro",
            ServerEvent::UserJoinedRetro(_) => "userJoinedRetro",
            ServerEvent::UserLeftRetro(_) => "userLeftRetro",
            ServerEvent::ColumnUpdated { .. } => "columnUpdated",
            ServerEvent::ColumnNameUpdated { .. } => "columnNameUpdated",
            ServerEvent::CardUpdated { .. } => "cardUpdated",
            ServerEvent::CardDeleted { .. } => "cardDeleted",
            ServerEvent::CommentAdded { .. } => "commentAdded",
            ServerEvent::CommentUpdated { .. } => "commentUpdated",
            ServerEvent::CommentDeleted { .. } => "commentDeleted",
            ServerEvent::IntentFailed { .. } => "intentFailed",
        }
    }

    /// Encode as a WebSocket text frame.
    pub fn to_message(&self) -> Result<Message, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(Message::Text(json.into()))
    }
}
