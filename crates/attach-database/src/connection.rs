//! PostgreSQL connection pool management.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use attach_core::config::DatabaseConfig;
use attach_core::error::{AppError, ErrorKind};

use crate::migration::run_migrations;
use crate::repositories::FileRecordRepository;

/// Wrapper around the sqlx PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Connect to PostgreSQL and, when configured, apply pending migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = Self::connect_only(config).await?;
        if config.run_migrations {
            run_migrations(pool.pool()).await?;
        }
        Ok(pool)
    }

    /// Connect without touching the schema.
    pub async fn connect_only(config: &DatabaseConfig) -> Result<Self, AppError> {
        info!(
            url = %redact_url(&config.url),
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to attachment metadata store"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to connect to database: {e}"),
                    e,
                )
            })?;

        Ok(Self { pool })
    }

    /// Return a reference to the underlying sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Build the file record repository on this pool.
    pub fn file_records(&self) -> FileRecordRepository {
        FileRecordRepository::new(self.pool.clone())
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Metadata store pool closed");
    }
}

/// Replace the password of a connection URL with `****` for logging.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
        None => url.to_string(),
    }
}
