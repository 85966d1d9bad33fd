#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::extract::ws::Message;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use retro_api::config::{ServerConfig, StoreBackend};
use retro_api::router::build_app_router;
use retro_api::state::AppState;
use retro_db::{BoardStore, MemoryBoardStore};
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults and the in-memory store.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        heartbeat_interval_secs: 30,
        store_backend: StoreBackend::Memory,
        database_url: None,
        database_max_connections: 1,
    }
}

/// App state around an in-memory store. The store handle is returned
/// separately so tests can seed fixtures the protocol cannot create
/// (retros, user profiles).
pub fn build_test_state() -> (AppState, Arc<MemoryBoardStore>) {
    let store = Arc::new(MemoryBoardStore::new());
    let state = AppState::new(Arc::clone(&store) as Arc<dyn BoardStore>, test_config());
    (state, store)
}

/// Build the full application router with all middleware layers.
///
/// Uses the same builder as `main.rs` so tests exercise the production
/// middleware stack.
pub fn build_test_app() -> (Router, AppState, Arc<MemoryBoardStore>) {
    let (state, store) = build_test_state();
    (build_app_router(state.clone()), state, store)
}

/// Pop the next JSON text frame queued for a connection, skipping control
/// frames. `None` when nothing is queued.
pub fn next_event(rx: &mut UnboundedReceiver<Message>) -> Option<serde_json::Value> {
    while let Ok(msg) = rx.try_recv() {
        if let Message::Text(text) = msg {
            return Some(serde_json::from_str(text.as_str()).expect("server frames are JSON"));
        }
    }
    None
}

/// Pop every queued JSON text frame.
pub fn drain_events(rx: &mut UnboundedReceiver<Message>) -> Vec<serde_json::Value> {
    std::iter::from_fn(|| next_event(rx)).collect()
}

/// Encode a client frame.
pub fn frame(event: &str, payload: serde_json::Value) -> String {
    serde_json::json!({ "event": event, "payload": payload }).to_string()
}

/// Send a GET request through the router.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
