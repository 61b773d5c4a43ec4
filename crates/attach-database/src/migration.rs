//! Migration runner for the attachment metadata schema.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use attach_core::error::{AppError, ErrorKind};

/// Migrations embedded from the workspace `migrations/` directory.
static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Apply every pending migration.
///
/// Returns the version of the newest known migration.
pub async fn run_migrations(pool: &PgPool) -> Result<Option<i64>, AppError> {
    let latest = MIGRATOR.iter().map(|m| m.version).max();
    info!(
        known = MIGRATOR.iter().count(),
        latest_version = ?latest,
        "Applying attachment schema migrations"
    );

    MIGRATOR.run(pool).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Database,
            format!("Failed to run migrations: {e}"),
            e,
        )
    })?;

    info!("Attachment schema is up to date");
    Ok(latest)
}
