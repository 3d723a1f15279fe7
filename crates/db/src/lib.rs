//! Persistence layer for Tally.
//!
//! [`storage::Storage`] is the single entry point handlers use. It wires one
//! implementation of each domain trait from [`stores`]: the Postgres
//! repositories in [`repositories`] or the in-process [`memory`] backend.

pub mod error;
pub mod files;
pub mod memory;
pub mod models;
pub mod repositories;
pub mod storage;
pub mod stores;

use sqlx::postgres::PgPoolOptions;

pub use error::{StoreError, StoreResult};
pub use storage::Storage;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the pool is usable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from the workspace `migrations/` directory.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
