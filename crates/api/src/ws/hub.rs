use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::Message;
use retro_core::types::{RetroId, UserId};
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::ws::protocol::ServerEvent;

/// Transport-level connection identifier.
pub type ConnId = String;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// Rooms this connection has joined, with the user it joined as.
    pub rooms: HashMap<RetroId, UserId>,
}

/// Serializes refresh-and-broadcast for one retro.
pub type PublishLock = Arc<Mutex<()>>;

#[derive(Default)]
struct HubState {
    connections: HashMap<ConnId, WsConnection>,
    /// Member connections per retro. Empty rooms are removed.
    rooms: HashMap<RetroId, HashSet<ConnId>>,
    /// Publish locks per retro. A lock outlives its room while any publisher
    /// still holds a handle, so a room that empties and refills keeps the
    /// same lock.
    publish_locks: HashMap<RetroId, PublishLock>,
}

/// Result of [`RoomHub::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The connection was added to the room.
    Joined,
    /// The connection was already a member; nothing changed.
    AlreadyJoined,
    /// The connection is not registered (already disconnected).
    UnknownConnection,
}

/// Session hub: live connections and their room memberships.
///
/// Connection and room tables sit behind one `RwLock` so that a connection's
/// room set and each room's member set are always updated together. Designed
/// to be wrapped in `Arc` and shared across the application.
pub struct RoomHub {
    state: RwLock<HubState>,
}

impl RoomHub {
    /// Create a new, empty hub.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HubState::default()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: ConnId) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            sender: tx,
            rooms: HashMap::new(),
        };
        self.state.write().await.connections.insert(conn_id, conn);
        rx
    }

    /// Remove a connection and drop it from every room it joined.
    ///
    /// Returns the `(room, user)` pairs it left so the caller can announce
    /// the departures. Rooms left empty are discarded.
    pub async fn remove(&self, conn_id: &str) -> Vec<(RetroId, UserId)> {
        let mut state = self.state.write().await;
        let Some(conn) = state.connections.remove(conn_id) else {
            return Vec::new();
        };

        let left: Vec<(RetroId, UserId)> = conn.rooms.into_iter().collect();
        for (retro_id, _) in &left {
            state.detach_member(*retro_id, conn_id);
        }
        left
    }

    /// Add a connection to a room.
    pub async fn join(&self, conn_id: &str, retro_id: RetroId, user_id: UserId) -> JoinOutcome {
        let mut state = self.state.write().await;
        let HubState {
            connections,
            rooms,
            publish_locks,
        } = &mut *state;

        let Some(conn) = connections.get_mut(conn_id) else {
            return JoinOutcome::UnknownConnection;
        };
        if conn.rooms.contains_key(&retro_id) {
            return JoinOutcome::AlreadyJoined;
        }

        conn.rooms.insert(retro_id, user_id);
        rooms
            .entry(retro_id)
            .or_default()
            .insert(conn_id.to_string());
        publish_locks.entry(retro_id).or_default();
        JoinOutcome::Joined
    }

    /// Remove a connection from one room. Returns the user it had joined as,
    /// or `None` if it was not a member.
    pub async fn leave(&self, conn_id: &str, retro_id: RetroId) -> Option<UserId> {
        let mut state = self.state.write().await;
        let user_id = state
            .connections
            .get_mut(conn_id)
            .and_then(|conn| conn.rooms.remove(&retro_id))?;
        state.detach_member(retro_id, conn_id);
        Some(user_id)
    }

    /// Send an event to every member of a room.
    ///
    /// Returns the number of connections the event was queued for. Closed
    /// channels are skipped; their connections are cleaned up by the socket
    /// handler.
    pub async fn broadcast(&self, retro_id: RetroId, event: &ServerEvent) -> usize {
        self.fan_out(retro_id, None, event).await
    }

    /// Send an event to every member of a room except `except`.
    pub async fn broadcast_except(
        &self,
        retro_id: RetroId,
        except: &str,
        event: &ServerEvent,
    ) -> usize {
        self.fan_out(retro_id, Some(except), event).await
    }

    /// Send an event to a single connection. Returns `false` if the
    /// connection is gone.
    pub async fn send_to(&self, conn_id: &str, event: &ServerEvent) -> bool {
        let Some(message) = encode(event) else {
            return false;
        };
        let state = self.state.read().await;
        state
            .connections
            .get(conn_id)
            .is_some_and(|conn| conn.sender.send(message).is_ok())
    }

    /// The publish lock of a retro, or `None` if nobody is in its room.
    ///
    /// Every handle returned for a retro is the same lock for as long as any
    /// handle is alive, even across the room emptying and being rejoined.
    pub async fn publish_lock(&self, retro_id: RetroId) -> Option<PublishLock> {
        let state = self.state.read().await;
        if !state.rooms.contains_key(&retro_id) {
            return None;
        }
        state.publish_locks.get(&retro_id).map(Arc::clone)
    }

    /// Connection ids currently in a room.
    pub async fn members(&self, retro_id: RetroId) -> Vec<ConnId> {
        self.state
            .read()
            .await
            .rooms
            .get(&retro_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Rooms a connection has joined.
    pub async fn rooms_of(&self, conn_id: &str) -> Vec<RetroId> {
        self.state
            .read()
            .await
            .connections
            .get(conn_id)
            .map(|conn| conn.rooms.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    /// Return the number of non-empty rooms.
    pub async fn room_count(&self) -> usize {
        self.state.read().await.rooms.len()
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let state = self.state.read().await;
        for conn in state.connections.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }

    /// Send a Close frame to every connection, then clear all tables.
    ///
    /// Used during graceful shutdown.
    pub async fn shutdown_all(&self) {
        let mut state = self.state.write().await;
        let count = state.connections.len();
        for conn in state.connections.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        state.connections.clear();
        state.rooms.clear();
        state.prune_publish_locks();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    async fn fan_out(&self, retro_id: RetroId, except: Option<&str>, event: &ServerEvent) -> usize {
        let Some(message) = encode(event) else {
            return 0;
        };
        let state = self.state.read().await;
        let Some(members) = state.rooms.get(&retro_id) else {
            return 0;
        };

        let mut count = 0;
        for conn_id in members {
            if except == Some(conn_id.as_str()) {
                continue;
            }
            if let Some(conn) = state.connections.get(conn_id) {
                if conn.sender.send(message.clone()).is_ok() {
                    count += 1;
                }
            }
        }
        tracing::debug!(retro_id = %retro_id, event = event.name(), count, "Room broadcast");
        count
    }
}

impl Default for RoomHub {
    fn default() -> Self {
        Self::new()
    }
}

impl HubState {
    fn detach_member(&mut self, retro_id: RetroId, conn_id: &str) {
        let Some(members) = self.rooms.get_mut(&retro_id) else {
            return;
        };
        members.remove(conn_id);
        if members.is_empty() {
            self.rooms.remove(&retro_id);
            self.prune_publish_locks();
        }
    }

    /// Drop locks of empty rooms that no publisher holds. A handle is only
    /// handed out under the state lock, so a count of one means nobody can
    /// be publishing under it.
    fn prune_publish_locks(&mut self) {
        let rooms = &self.rooms;
        self.publish_locks
            .retain(|retro_id, lock| rooms.contains_key(retro_id) || Arc::strong_count(lock) > 1);
    }
}

fn encode(event: &ServerEvent) -> Option<Message> {
    match event.to_message() {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::error!(event = event.name(), error = %e, "Failed to encode server event");
            None
        }
    }
}
