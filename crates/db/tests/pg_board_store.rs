//! Integration tests for the Postgres-backed store.
//!
//! These run against a real database through `#[sqlx::test]`, which creates
//! a fresh database per test and applies `db/migrations`. `DATABASE_URL`
//! must point at a Postgres server the tests can create databases on.

use std::collections::HashSet;

use assert_matches::assert_matches;
use retro_core::error::CoreError;
use retro_core::types::{DbId, RetroId};
use retro_db::models::card::CardRemoval;
use retro_db::repositories::{CardRepo, ColumnRepo};
use retro_db::{BoardStore, DbError, PgBoardStore};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_retro(pool: &PgPool, title: &str) -> RetroId {
    let id = uuid::Uuid::new_v4();
    sqlx::query("INSERT INTO retros (id, title) VALUES ($1, $2)")
        .bind(id)
        .bind(title)
        .execute(pool)
        .await
        .unwrap();
    id
}

async fn seed_user(pool: &PgPool, name: &str) -> uuid::Uuid {
    let id = uuid::Uuid::new_v4();
    sqlx::query("INSERT INTO user_profiles (user_id, user_name) VALUES ($1, $2)")
        .bind(id)
        .bind(name)
        .execute(pool)
        .await
        .unwrap();
    id
}

async fn card_row_count(pool: &PgPool) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cards")
        .fetch_one(pool)
        .await
        .unwrap();
    count
}

// ---------------------------------------------------------------------------
// Ordered membership
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_then_delete_preserves_order(pool: PgPool) {
    let retro_id = seed_retro(&pool, "Sprint 1").await;
    let user = seed_user(&pool, "Ada").await;
    let store = PgBoardStore::new(pool.clone());
    let column = store.create_column(retro_id).await.unwrap();

    let a = store.create_card(column.id, user).await.unwrap();
    let b = store.create_card(column.id, user).await.unwrap();
    assert_eq!(store.list_card_ids_for_column(column.id).await.unwrap(), vec![a, b]);

    store.delete_card(a, column.id).await.unwrap();
    assert_eq!(store.list_card_ids_for_column(column.id).await.unwrap(), vec![b]);

    let cards = store.list_cards_for_column(column.id).await.unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].user_name.as_deref(), Some("Ada"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_card_is_idempotent(pool: PgPool) {
    let retro_id = seed_retro(&pool, "Sprint 1").await;
    let column = ColumnRepo::create(&pool, retro_id, "Went well")
        .await
        .unwrap()
        .unwrap();
    let user = uuid::Uuid::new_v4();
    let card_id = CardRepo::create_in_column(&pool, column.id, user, "hello")
        .await
        .unwrap()
        .unwrap();

    let first = CardRepo::delete_from_column(&pool, card_id, column.id).await.unwrap();
    let second = CardRepo::delete_from_column(&pool, card_id, column.id).await.unwrap();

    assert_eq!(first, CardRemoval::Removed);
    assert_eq!(second, CardRemoval::AlreadyAbsent);
    let column = ColumnRepo::find_by_id(&pool, column.id).await.unwrap().unwrap();
    assert!(column.card_ids.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_card_from_wrong_column_rolls_back(pool: PgPool) {
    let retro_id = seed_retro(&pool, "Sprint 1").await;
    let store = PgBoardStore::new(pool.clone());
    let left = store.create_column(retro_id).await.unwrap();
    let right = store.create_column(retro_id).await.unwrap();
    let card_id = store.create_card(left.id, uuid::Uuid::new_v4()).await.unwrap();

    let err = store.delete_card(card_id, right.id).await.unwrap_err();

    assert_matches!(err, DbError::Core(CoreError::Conflict(_)));
    assert!(store.find_card(card_id).await.unwrap().is_some());
    assert_eq!(store.list_card_ids_for_column(left.id).await.unwrap(), vec![card_id]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_card_in_missing_column_leaves_no_row(pool: PgPool) {
    let store = PgBoardStore::new(pool.clone());

    let err = store.create_card(987_654, uuid::Uuid::new_v4()).await.unwrap_err();

    assert_matches!(err, DbError::Core(CoreError::NotFound { entity: "Column", .. }));
    assert_eq!(card_row_count(&pool).await, 0);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_creates_are_all_appended(pool: PgPool) {
    const N: usize = 20;

    let retro_id = seed_retro(&pool, "Busy").await;
    let store = PgBoardStore::new(pool.clone());
    let column = store.create_column(retro_id).await.unwrap();

    let tasks = (0..N).map(|_| {
        let store = store.clone();
        let column_id = column.id;
        tokio::spawn(async move { store.create_card(column_id, uuid::Uuid::new_v4()).await })
    });
    let created: Vec<DbId> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let ids = store.list_card_ids_for_column(column.id).await.unwrap();
    assert_eq!(ids.len(), N);
    let listed: HashSet<DbId> = ids.into_iter().collect();
    assert_eq!(listed, created.into_iter().collect::<HashSet<_>>());
}

// ---------------------------------------------------------------------------
// Column deletion and derived reads
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_column_cascades(pool: PgPool) {
    let retro_id = seed_retro(&pool, "Sprint 1").await;
    let user = seed_user(&pool, "Grace").await;
    let store = PgBoardStore::new(pool.clone());
    let keep = store.create_column(retro_id).await.unwrap();
    let doomed = store.create_column(retro_id).await.unwrap();
    let kept_card = store.create_card(keep.id, user).await.unwrap();
    let doomed_card = store.create_card(doomed.id, user).await.unwrap();
    store.add_comment(doomed_card, "gone soon", user).await.unwrap();
    store.add_comment(kept_card, "stays", user).await.unwrap();

    let removed = store.delete_column(retro_id, doomed.id).await.unwrap();

    assert_eq!(removed, vec![doomed_card]);
    assert_eq!(card_row_count(&pool).await, 1);
    let comments = store.list_comments_for_session(retro_id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].user_name.as_deref(), Some("Grace"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_texts_return_joined_rows(pool: PgPool) {
    let retro_id = seed_retro(&pool, "Sprint 1").await;
    let user = seed_user(&pool, "Linus").await;
    let store = PgBoardStore::new(pool.clone());
    let column = store.create_column(retro_id).await.unwrap();
    let card_id = store.create_card(column.id, user).await.unwrap();

    let card = store.update_card_text(card_id, "Ship it").await.unwrap();
    assert_eq!(card.card_text, "Ship it");
    assert_eq!(card.user_name.as_deref(), Some("Linus"));

    let comment = store.add_comment(card_id, "agreed", user).await.unwrap();
    let edited = store.edit_comment_text(comment.id, "strongly agreed").await.unwrap();
    assert_eq!(edited.comment_text, "strongly agreed");
    assert_eq!(store.find_retro_for_card(card_id).await.unwrap(), Some(retro_id));
}
