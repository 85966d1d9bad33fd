use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use crate::state::AppState;
use crate::ws::protocol::ServerEvent;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with the `RoomHub`,
/// greeted with its id, and its inbound frames are fed to the gateway.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with the hub and sends `connected`.
///   2. Spawns a sender task that forwards messages from the hub channel.
///   3. Hands each inbound text frame to the gateway, one at a time.
///   4. On disconnect, leaves every joined room and stops the sender.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let mut rx = state.hub.add(conn_id.clone()).await;
    state
        .hub
        .send_to(
            &conn_id,
            &ServerEvent::Connected {
                conn_id: conn_id.clone(),
            },
        )
        .await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    // Receiver loop: intents from one connection are handled in order.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                state.gateway.handle_text(&conn_id, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Binary(_)) => {
                tracing::debug!(conn_id = %conn_id, "Ignoring binary frame");
            }
            Ok(Message::Ping(_)) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: leave all rooms and abort sender task.
    state.gateway.disconnect(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
