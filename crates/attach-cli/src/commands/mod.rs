//! CLI command definitions and dispatch.

pub mod archive;
pub mod attachment;
pub mod fetch;
pub mod ingest;
pub mod migrate;
pub mod orphans;
pub mod serve;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use attach_core::config::{AppConfig, DatabaseBackend};
use attach_core::error::AppError;
use attach_database::store::FileRecordStore;
use attach_database::{DatabasePool, InMemoryFileRecordStore};
use attach_service::AttachmentService;
use attach_storage::StorageManager;

use crate::output::OutputFormat;

/// Article attachment management
#[derive(Debug, Parser)]
#[command(name = "attach", version, about, long_about = None)]
pub struct Cli {
    /// Base configuration file, without extension
    #[arg(short, long, default_value = "config/default")]
    pub config: String,

    /// Environment overlay loaded from `config/{env}`
    #[arg(short, long)]
    pub env: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the attachment server
    Serve(serve::ServeArgs),
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Upload local files or directories to an article
    Ingest(ingest::IngestArgs),
    /// Inspect and delete stored attachments
    #[command(flatten)]
    Attachment(attachment::AttachmentCommand),
    /// Download one stored object
    Fetch(fetch::FetchArgs),
    /// Download an article's attachments as a ZIP archive
    Archive(archive::ArchiveArgs),
    /// Find or purge objects that no record points to
    Orphans(orphans::OrphansArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = load_config(&self.config, self.env.as_deref())?;
        match &self.command {
            Commands::Serve(args) => serve::execute(args, config).await,
            Commands::Migrate(args) => migrate::execute(args, &config).await,
            Commands::Ingest(args) => ingest::execute(args, &config, self.format).await,
            Commands::Attachment(args) => attachment::execute(args, &config, self.format).await,
            Commands::Fetch(args) => fetch::execute(args, &config).await,
            Commands::Archive(args) => archive::execute(args, &config).await,
            Commands::Orphans(args) => orphans::execute(args, &config, self.format).await,
        }
    }
}

/// Helper: load configuration from a base file and an optional overlay
pub fn load_config(base: &str, env: Option<&str>) -> Result<AppConfig, AppError> {
    let overlay = env.map(|env| format!("config/{env}"));
    AppConfig::load_from(base, overlay.as_deref())
}

/// Attachment service wired from configuration, plus the pool to close.
#[derive(Debug)]
pub struct ServiceContext {
    /// Attachment service
    pub attachments: AttachmentService,
    /// Open database pool, when the Postgres backend is configured
    pub pool: Option<DatabasePool>,
}

impl ServiceContext {
    /// Release database connections.
    pub async fn close(self) {
        if let Some(pool) = self.pool {
            pool.close().await;
        }
    }
}

/// Helper: connect storage and the metadata store, then build the service
pub async fn build_service(config: &AppConfig) -> Result<ServiceContext, AppError> {
    let storage = Arc::new(StorageManager::from_config(&config.storage).await?);

    let (store, pool): (Arc<dyn FileRecordStore>, Option<DatabasePool>) =
        match config.database.backend {
            DatabaseBackend::Postgres => {
                let pool = DatabasePool::connect(&config.database).await?;
                (Arc::new(pool.file_records()), Some(pool))
            }
            DatabaseBackend::Memory => {
                tracing::warn!("Using the in-memory metadata store; records are lost on exit");
                (Arc::new(InMemoryFileRecordStore::new()), None)
            }
        };

    let attachments = AttachmentService::new(
        store,
        storage,
        config.ingest.clone(),
        Some(config.storage.max_upload_size_bytes),
    );
    Ok(ServiceContext { attachments, pool })
}

/// Helper: ask for confirmation unless `assume_yes` is set
pub fn confirm(prompt: &str, assume_yes: bool) -> Result<bool, AppError> {
    if assume_yes {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}
