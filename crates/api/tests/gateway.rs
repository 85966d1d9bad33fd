//! Tests for the mutation gateway, driven through `handle_text` exactly as
//! the socket handler does, against the in-memory store.
//!
//! Each connection is registered with the hub directly; outbound frames are
//! read from its channel.

mod common;

use std::sync::Arc;

use axum::extract::ws::Message;
use retro_api::state::AppState;
use retro_core::types::{RetroId, UserId};
use retro_db::{BoardStore, MemoryBoardStore};
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;

use common::{build_test_state, drain_events, frame, next_event};

type Rx = UnboundedReceiver<Message>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Board {
    state: AppState,
    store: Arc<MemoryBoardStore>,
    retro_id: RetroId,
}

async fn board() -> Board {
    let (state, store) = build_test_state();
    let retro = store.insert_retro("Sprint 7").await;
    Board {
        state,
        store,
        retro_id: retro.id,
    }
}

impl Board {
    async fn send(&self, conn_id: &str, event: &str, payload: Value) {
        self.state
            .gateway
            .handle_text(conn_id, &frame(event, payload))
            .await;
    }

    /// Register a connection, join the board's room and discard the
    /// snapshot and presence frames the join produced.
    async fn joined(&self, conn_id: &str, user_id: UserId, others: &mut [&mut Rx]) -> Rx {
        let mut rx = self.state.hub.add(conn_id.to_string()).await;
        self.send(
            conn_id,
            "joinRetro",
            json!({ "user_id": user_id, "session_id": self.retro_id }),
        )
        .await;
        assert_eq!(next_event(&mut rx).unwrap()["event"], "initRetro");
        for other in others.iter_mut() {
            drain_events(other);
        }
        rx
    }

    async fn columns_json(&self) -> Value {
        serde_json::to_value(self.store.list_columns(self.retro_id).await.unwrap()).unwrap()
    }
}

fn user() -> UserId {
    uuid::Uuid::new_v4()
}

/// Assert exactly one frame is queued and return it.
fn only_event(rx: &mut Rx) -> Value {
    let mut events = drain_events(rx);
    assert_eq!(events.len(), 1, "expected exactly one frame, got {events:?}");
    events.remove(0)
}

// ---------------------------------------------------------------------------
// Test: join sends the full snapshot to the caller only
// ---------------------------------------------------------------------------

#[tokio::test]
async fn join_snapshot_contains_every_persisted_entity() {
    let b = board().await;
    let author = user();
    b.store.set_user_name(author, "Ada").await;
    let column = b.store.create_column(b.retro_id).await.unwrap();
    let first = b.store.create_card(column.id, author).await.unwrap();
    let second = b.store.create_card(column.id, author).await.unwrap();
    b.store.add_comment(first, "+1", author).await.unwrap();
    b.store.add_comment(second, "agreed", author).await.unwrap();

    let mut rx = b.state.hub.add("conn-1".to_string()).await;
    b.send(
        "conn-1",
        "joinRetro",
        json!({ "user_id": author, "retro_id": b.retro_id }),
    )
    .await;

    let event = only_event(&mut rx);
    assert_eq!(event["event"], "initRetro");
    let snapshot = &event["payload"];
    assert_eq!(snapshot["retro"]["id"], b.retro_id.to_string());
    assert_eq!(snapshot["columns"].as_array().unwrap().len(), 1);
    assert_eq!(snapshot["cards"].as_array().unwrap().len(), 2);
    assert_eq!(snapshot["comments"].as_array().unwrap().len(), 2);
    assert_eq!(snapshot["cards"][0]["id"], first);
    assert_eq!(snapshot["cards"][1]["id"], second);
    assert_eq!(snapshot["cards"][0]["user_name"], "Ada");
}

#[tokio::test]
async fn join_unknown_retro_fails_without_joining() {
    let b = board().await;
    let mut rx = b.state.hub.add("conn-1".to_string()).await;

    b.send(
        "conn-1",
        "joinRetro",
        json!({ "user_id": user(), "session_id": uuid::Uuid::new_v4() }),
    )
    .await;

    let event = only_event(&mut rx);
    assert_eq!(event["event"], "intentFailed");
    assert_eq!(event["payload"]["event"], "joinRetro");
    assert_eq!(event["payload"]["code"], "NOT_FOUND");
    assert_eq!(b.state.hub.room_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: presence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_join_is_announced_to_others_only() {
    let b = board().await;
    let mut rx1 = b.joined("conn-1", user(), &mut []).await;

    let newcomer = user();
    let mut rx2 = b.state.hub.add("conn-2".to_string()).await;
    b.send(
        "conn-2",
        "joinRetro",
        json!({ "user_id": newcomer, "session_id": b.retro_id }),
    )
    .await;

    let announced = only_event(&mut rx1);
    assert_eq!(announced["event"], "userJoinedRetro");
    assert_eq!(announced["payload"], newcomer.to_string());
    assert_eq!(only_event(&mut rx2)["event"], "initRetro");

    // Rejoining resends the snapshot without a second announcement.
    b.send(
        "conn-2",
        "joinRetro",
        json!({ "user_id": newcomer, "session_id": b.retro_id }),
    )
    .await;
    assert!(drain_events(&mut rx1).is_empty());
    assert_eq!(only_event(&mut rx2)["event"], "initRetro");
}

#[tokio::test]
async fn leave_retro_announces_and_stops_delivery() {
    let b = board().await;
    let mut rx1 = b.joined("conn-1", user(), &mut []).await;
    let leaver = user();
    let mut rx2 = b.joined("conn-2", leaver, &mut [&mut rx1]).await;

    b.send("conn-2", "leaveRetro", json!({ "session_id": b.retro_id }))
        .await;

    let left = only_event(&mut rx1);
    assert_eq!(left["event"], "userLeftRetro");
    assert_eq!(left["payload"], leaver.to_string());
    assert!(drain_events(&mut rx2).is_empty());

    b.send("conn-1", "columnAdded", json!({ "session_id": b.retro_id }))
        .await;
    assert_eq!(only_event(&mut rx1)["event"], "columnUpdated");
    assert!(drain_events(&mut rx2).is_empty());
}

#[tokio::test]
async fn disconnect_removes_connection_from_every_room() {
    let b = board().await;
    let mut rx1 = b.joined("conn-1", user(), &mut []).await;
    let quitter = user();
    let _rx2 = b.joined("conn-2", quitter, &mut [&mut rx1]).await;

    b.state.gateway.disconnect("conn-2").await;

    let left = only_event(&mut rx1);
    assert_eq!(left["event"], "userLeftRetro");
    assert_eq!(left["payload"], quitter.to_string());
    assert_eq!(b.state.hub.members(b.retro_id).await, vec!["conn-1".to_string()]);
    assert!(b.state.hub.rooms_of("conn-2").await.is_empty());

    b.state.gateway.disconnect("conn-1").await;
    assert_eq!(b.state.hub.room_count().await, 0);
    assert_eq!(b.state.hub.connection_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: broadcast completeness
// ---------------------------------------------------------------------------

#[tokio::test]
async fn column_added_reaches_every_member_once_with_fresh_state() {
    let b = board().await;
    let mut rx1 = b.joined("conn-1", user(), &mut []).await;
    let mut rx2 = b.joined("conn-2", user(), &mut [&mut rx1]).await;

    b.send("conn-1", "columnAdded", json!({ "session_id": b.retro_id }))
        .await;

    let columns = b.columns_json().await;
    for rx in [&mut rx1, &mut rx2] {
        let event = only_event(rx);
        assert_eq!(event["event"], "columnUpdated");
        assert_eq!(event["payload"]["columns"], columns);
        assert_eq!(event["payload"]["retro"]["id"], b.retro_id.to_string());
        assert_eq!(event["payload"]["column_id"], columns[0]["id"]);
    }
}

#[tokio::test]
async fn column_renamed_broadcasts_name_and_column_list() {
    let b = board().await;
    let column = b.store.create_column(b.retro_id).await.unwrap();
    let mut rx1 = b.joined("conn-1", user(), &mut []).await;
    let mut rx2 = b.joined("conn-2", user(), &mut [&mut rx1]).await;

    b.send(
        "conn-2",
        "columnRenamed",
        json!({ "session_id": b.retro_id, "column_id": column.id, "column_name": "Went well" }),
    )
    .await;

    let columns = b.columns_json().await;
    assert_eq!(columns[0]["column_name"], "Went well");
    for rx in [&mut rx1, &mut rx2] {
        let event = only_event(rx);
        assert_eq!(event["event"], "columnNameUpdated");
        assert_eq!(event["payload"]["column_id"], column.id);
        assert_eq!(event["payload"]["column_name"], "Went well");
        assert_eq!(event["payload"]["columns"], columns);
    }
}

#[tokio::test]
async fn column_deleted_cascades_and_broadcasts() {
    let b = board().await;
    let keep = b.store.create_column(b.retro_id).await.unwrap();
    let doomed = b.store.create_column(b.retro_id).await.unwrap();
    let card_id = b.store.create_card(doomed.id, user()).await.unwrap();
    let mut rx = b.joined("conn-1", user(), &mut []).await;

    b.send(
        "conn-1",
        "columnDeleted",
        json!({ "session_id": b.retro_id, "column_id": doomed.id }),
    )
    .await;

    let event = only_event(&mut rx);
    assert_eq!(event["event"], "columnUpdated");
    assert_eq!(event["payload"]["column_id"], doomed.id);
    let columns = event["payload"]["columns"].as_array().unwrap();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0]["id"], keep.id);
    assert!(b.store.find_card(card_id).await.unwrap().is_none());
}

#[tokio::test]
async fn card_lifecycle_broadcasts_column_scope() {
    let b = board().await;
    let column = b.store.create_column(b.retro_id).await.unwrap();
    let author = user();
    let mut rx1 = b.joined("conn-1", author, &mut []).await;
    let mut rx2 = b.joined("conn-2", user(), &mut [&mut rx1]).await;

    b.send(
        "conn-1",
        "cardAdded",
        json!({ "session_id": b.retro_id, "column_id": column.id, "user_id": author }),
    )
    .await;

    let card_ids = b.store.list_card_ids_for_column(column.id).await.unwrap();
    assert_eq!(card_ids.len(), 1);
    let card_id = card_ids[0];
    for rx in [&mut rx1, &mut rx2] {
        let event = only_event(rx);
        assert_eq!(event["event"], "cardUpdated");
        assert_eq!(event["payload"]["card_id"], card_id);
        assert_eq!(event["payload"]["column"]["card_ids"], json!([card_id]));
        assert_eq!(event["payload"]["cards"][0]["card_text"], "New Card");
    }

    b.send(
        "conn-2",
        "changeCardText",
        json!({ "card_id": card_id, "card_text": "Deploys were smooth" }),
    )
    .await;
    for rx in [&mut rx1, &mut rx2] {
        let event = only_event(rx);
        assert_eq!(event["event"], "cardUpdated");
        assert_eq!(event["payload"]["cards"][0]["card_text"], "Deploys were smooth");
    }

    b.send(
        "conn-1",
        "removeCard",
        json!({ "card_id": card_id, "column_id": column.id }),
    )
    .await;
    for rx in [&mut rx1, &mut rx2] {
        let event = only_event(rx);
        assert_eq!(event["event"], "cardDeleted");
        assert_eq!(event["payload"]["card_id"], card_id);
        assert_eq!(event["payload"]["cards"], json!([]));
        assert_eq!(event["payload"]["column"]["card_ids"], json!([]));
    }

    // Removing again is a successful no-op and still refreshes the room.
    b.send(
        "conn-1",
        "removeCard",
        json!({ "card_id": card_id, "column_id": column.id }),
    )
    .await;
    assert_eq!(only_event(&mut rx1)["event"], "cardDeleted");
    assert_eq!(b.store.card_count().await, 0);
}

#[tokio::test]
async fn comment_lifecycle_broadcasts_card_scope() {
    let b = board().await;
    let column = b.store.create_column(b.retro_id).await.unwrap();
    let card_id = b.store.create_card(column.id, user()).await.unwrap();
    let author = user();
    b.store.set_user_name(author, "Grace").await;
    let mut rx = b.joined("conn-1", author, &mut []).await;

    b.send(
        "conn-1",
        "addComment",
        json!({ "user_id": author, "card_id": card_id, "comment_text": "Nice" }),
    )
    .await;
    let added = only_event(&mut rx);
    assert_eq!(added["event"], "commentAdded");
    assert_eq!(added["payload"]["card_id"], card_id);
    assert_eq!(added["payload"]["comments"][0]["user_name"], "Grace");
    let comment_id = added["payload"]["comments"][0]["id"].as_i64().unwrap();

    b.send(
        "conn-1",
        "changeCommentText",
        json!({ "comment_id": comment_id, "comment_text": "Very nice" }),
    )
    .await;
    let updated = only_event(&mut rx);
    assert_eq!(updated["event"], "commentUpdated");
    assert_eq!(updated["payload"]["comments"][0]["comment_text"], "Very nice");

    b.send("conn-1", "removeComment", json!({ "comment_id": comment_id }))
        .await;
    let deleted = only_event(&mut rx);
    assert_eq!(deleted["event"], "commentDeleted");
    assert_eq!(deleted["payload"]["comment_id"], comment_id);
    assert_eq!(deleted["payload"]["card_id"], card_id);
    assert_eq!(deleted["payload"]["comments"], json!([]));
}

#[tokio::test]
async fn mutation_by_non_member_is_applied_without_broadcast() {
    let b = board().await;
    let mut rx = b.state.hub.add("conn-1".to_string()).await;

    b.send("conn-1", "columnAdded", json!({ "session_id": b.retro_id }))
        .await;

    assert!(drain_events(&mut rx).is_empty());
    assert_eq!(b.store.list_columns(b.retro_id).await.unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: failure containment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rename_of_missing_column_is_contained() {
    let b = board().await;
    b.store.create_column(b.retro_id).await.unwrap();
    let mut rx1 = b.joined("conn-1", user(), &mut []).await;
    let mut rx2 = b.joined("conn-2", user(), &mut [&mut rx1]).await;
    let before = b.columns_json().await;

    b.send(
        "conn-1",
        "columnRenamed",
        json!({ "session_id": b.retro_id, "column_id": 9_999, "column_name": "Nope" }),
    )
    .await;

    let failure = only_event(&mut rx1);
    assert_eq!(failure["event"], "intentFailed");
    assert_eq!(failure["payload"]["event"], "columnRenamed");
    assert_eq!(failure["payload"]["code"], "NOT_FOUND");
    assert!(drain_events(&mut rx2).is_empty());
    assert_eq!(b.columns_json().await, before);
}

#[tokio::test]
async fn malformed_frames_are_rejected_to_the_sender_only() {
    let b = board().await;
    let mut rx1 = b.joined("conn-1", user(), &mut []).await;
    let mut rx2 = b.joined("conn-2", user(), &mut [&mut rx1]).await;

    b.state.gateway.handle_text("conn-1", "{oops").await;
    let failure = only_event(&mut rx1);
    assert_eq!(failure["payload"]["event"], "unknown");
    assert_eq!(failure["payload"]["code"], "VALIDATION_ERROR");

    b.send("conn-1", "addVote", json!({ "card_id": 1 })).await;
    assert_eq!(only_event(&mut rx1)["payload"]["event"], "addVote");

    b.send("conn-1", "columnAdded", json!({ "session_id": "not-a-uuid" }))
        .await;
    assert_eq!(only_event(&mut rx1)["payload"]["code"], "VALIDATION_ERROR");

    assert!(drain_events(&mut rx2).is_empty());
    assert!(b.store.list_columns(b.retro_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn blank_comment_is_a_validation_error() {
    let b = board().await;
    let column = b.store.create_column(b.retro_id).await.unwrap();
    let card_id = b.store.create_card(column.id, user()).await.unwrap();
    let mut rx = b.joined("conn-1", user(), &mut []).await;

    b.send(
        "conn-1",
        "addComment",
        json!({ "user_id": user(), "card_id": card_id, "comment_text": "  " }),
    )
    .await;

    let failure = only_event(&mut rx);
    assert_eq!(failure["payload"]["code"], "VALIDATION_ERROR");
    assert_eq!(b.store.comment_count().await, 0);
}

#[tokio::test]
async fn card_added_to_column_of_other_retro_is_rejected() {
    let b = board().await;
    let other = b.store.insert_retro("Other team").await;
    let foreign = b.store.create_column(other.id).await.unwrap();
    let mut rx = b.joined("conn-1", user(), &mut []).await;

    b.send(
        "conn-1",
        "cardAdded",
        json!({ "session_id": b.retro_id, "column_id": foreign.id, "user_id": user() }),
    )
    .await;

    assert_eq!(only_event(&mut rx)["payload"]["code"], "NOT_FOUND");
    assert_eq!(b.store.card_count().await, 0);
}

#[tokio::test]
async fn remove_card_from_wrong_column_is_a_conflict() {
    let b = board().await;
    let left = b.store.create_column(b.retro_id).await.unwrap();
    let right = b.store.create_column(b.retro_id).await.unwrap();
    let card_id = b.store.create_card(left.id, user()).await.unwrap();
    let mut rx = b.joined("conn-1", user(), &mut []).await;

    b.send(
        "conn-1",
        "removeCard",
        json!({ "card_id": card_id, "column_id": right.id }),
    )
    .await;

    assert_eq!(only_event(&mut rx)["payload"]["code"], "CONFLICT");
    assert_eq!(
        b.store.list_card_ids_for_column(left.id).await.unwrap(),
        vec![card_id]
    );
}
