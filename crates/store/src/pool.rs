use crate::error::map_sqlx_error;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::instrument;
use txidx_errors::CoreError;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("src/migrations");

/// Connect to Postgres and run any pending embedded migrations.
///
/// Called once at process start; the returned pool is a process-lifetime
/// singleton shared by `Arc` with every component that needs durable
/// storage.
#[instrument(skip(database_url))]
pub async fn connect(database_url: &str) -> Result<PgPool, CoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(map_sqlx_error)?;
    MIGRATOR.run(&pool).await.map_err(|e| CoreError::StorageError(e.to_string()))?;
    Ok(pool)
}
