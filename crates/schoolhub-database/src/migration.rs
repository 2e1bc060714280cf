//! Schema migrations for the PostgreSQL document store.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use schoolhub_core::error::{AppError, ErrorKind};

/// Migrations embedded from the workspace `migrations/` directory.
static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Apply every migration not yet recorded in `_sqlx_migrations`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    let known = MIGRATOR.iter().count();
    info!(known, "Applying pending migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, format!("Migration failed: {e}"), e)
    })?;

    info!("Document store schema is up to date");
    Ok(())
}
