//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod database;
pub mod ingest;
pub mod logging;
pub mod storage;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::database::{DatabaseBackend, DatabaseConfig};
pub use self::ingest::{
    DeleteFailurePolicy, IngestConfig, OrphanPolicy, ReplaceAllConfig, ReplaceAllScope,
};
pub use self::logging::LoggingConfig;
pub use self::storage::{LocalStorageConfig, S3StorageConfig, StorageConfig, StorageProviderKind};

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Metadata store settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Object storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Upload ingestion policies.
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for the given environment name.
    ///
    /// Merges `config/default.toml` with `config/{env}.toml` and
    /// environment variables prefixed with `ATTACH__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from("config/default", Some(&format!("config/{env}")))
    }

    /// Load configuration from an explicit base file and optional overlay.
    ///
    /// Both files are optional; missing sections fall back to defaults.
    pub fn load_from(base: &str, overlay: Option<&str>) -> Result<Self, AppError> {
        let mut builder =
            config::Config::builder().add_source(config::File::with_name(base).required(false));

        if let Some(overlay) = overlay {
            builder = builder.add_source(config::File::with_name(overlay).required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("ATTACH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.ingest.max_concurrent_uploads == 0 {
            return Err(AppError::configuration(
                "ingest.max_concurrent_uploads must be at least 1",
            ));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(AppError::configuration("storage.bucket must not be empty"));
        }
        if self.database.backend == DatabaseBackend::Postgres && self.database.url.is_empty() {
            return Err(AppError::configuration(
                "database.url is required for the postgres backend",
            ));
        }
        self.ingest.validate_pattern()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid_for_memory_backend() {
        let mut config = AppConfig::default();
        config.database.backend = DatabaseBackend::Memory;
        assert!(config.validate().is_ok());
        assert_eq!(config.ingest.max_concurrent_uploads, 4);
        assert_eq!(config.storage.bucket, "attachments");
    }

    #[test]
    fn test_postgres_requires_url() {
        let mut config = AppConfig::default();
        config.database.backend = DatabaseBackend::Postgres;
        config.database.url.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = AppConfig::default();
        config.database.backend = DatabaseBackend::Memory;
        config.ingest.max_concurrent_uploads = 0;
        assert!(config.validate().is_err());
    }
}
