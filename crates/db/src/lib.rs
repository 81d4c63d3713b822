//! Relational access layer.
//!
//! SQLite via sqlx: pool construction, embedded migrations, and the
//! repository modules. Repositories are zero-sized structs whose async
//! methods take `&SqlitePool` as the first argument.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use drivewatch_core::CoreError;

pub mod models;
pub mod repositories;

/// Convenience alias used across the workspace.
pub type DbPool = SqlitePool;

/// Create a connection pool for the given SQLite URL, creating the database
/// file if it does not exist yet.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// Create an in-memory pool for tests and ephemeral development runs.
///
/// Capped at one connection: every connection to `:memory:` would otherwise
/// see its own private database.
pub async fn memory_pool() -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
}

/// Apply embedded migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Cheap liveness probe used at startup.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Map an infrastructure-level sqlx error into the domain taxonomy.
///
/// Row lookups that may legitimately miss use `fetch_optional`, so anything
/// arriving here is an unexpected infrastructure failure.
pub fn into_core(err: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("database error: {err}"))
}
