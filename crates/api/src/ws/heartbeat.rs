use std::sync::Arc;
use std::time::Duration;

use crate::ws::hub::RoomHub;

/// Spawn a background task that sends periodic Ping frames to all connected
/// WebSocket clients.
///
/// The task runs until aborted through the returned `JoinHandle`, which
/// `main` does during graceful shutdown.
pub fn start_heartbeat(hub: Arc<RoomHub>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;
            let count = hub.connection_count().await;
            tracing::debug!(count, "WebSocket heartbeat ping");
            hub.ping_all().await;
        }
    })
}
