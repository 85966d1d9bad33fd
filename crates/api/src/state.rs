use std::sync::Arc;

use retro_db::BoardStore;

use crate::config::ServerConfig;
use crate::gateway::Gateway;
use crate::ws::RoomHub;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Board persistence (Postgres or in-memory).
    pub store: Arc<dyn BoardStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Room membership and fan-out for WebSocket connections.
    pub hub: Arc<RoomHub>,
    /// Dispatches client intents against the store and the hub.
    pub gateway: Arc<Gateway>,
}

impl AppState {
    /// Wire up hub and gateway around a store.
    pub fn new(store: Arc<dyn BoardStore>, config: ServerConfig) -> Self {
        let hub = Arc::new(RoomHub::new());
        let gateway = Arc::new(Gateway::new(Arc::clone(&store), Arc::clone(&hub)));
        Self {
            store,
            config: Arc::new(config),
            hub,
            gateway,
        }
    }
}
