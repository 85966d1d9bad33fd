//! WebSocket infrastructure for real-time board sync.
//!
//! Provides the session hub, the typed wire protocol, heartbeat monitoring,
//! and the HTTP upgrade handler used by Axum routes.

mod handler;
mod heartbeat;
pub mod hub;
pub mod protocol;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use hub::{ConnId, JoinOutcome, PublishLock, RoomHub};
pub use protocol::{ClientIntent, ServerEvent};
