//! Persistence layer for retro boards.
//!
//! - [`models`]: row structs returned by queries.
//! - [`repositories`]: zero-sized structs with async queries over `&PgPool`.
//! - [`store`]: the [`BoardStore`] trait the realtime server talks to, with a
//!   Postgres implementation and an in-memory one.

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;
pub mod store;

pub use store::{BoardStore, MemoryBoardStore, PgBoardStore};

pub type DbPool = sqlx::PgPool;

/// Error returned by every [`BoardStore`] operation.
///
/// Domain outcomes (missing rows, membership conflicts) are lifted into
/// [`CoreError`](retro_core::error::CoreError); anything the driver reports
/// is passed through untouched.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Core(#[from] retro_core::error::CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply any pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
