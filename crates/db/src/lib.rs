//! Persistence layer.
//!
//! Models mirror table rows, repositories are zero-sized structs whose async
//! functions take `&PgPool`, and [`store`] exposes the batched lookups the
//! loaders and the as-code orchestrator depend on.

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod query;
pub mod repositories;
pub mod store;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to make sure the database answers.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `migrations/`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
