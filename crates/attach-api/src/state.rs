//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use attach_core::config::AppConfig;
use attach_database::store::FileRecordStore;
use attach_database::InMemoryFileRecordStore;
use attach_service::AttachmentService;
use attach_storage::StorageManager;
use attach_storage::providers::MemoryStorageProvider;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,

    // ── Infrastructure ───────────────────────────────────────
    /// Storage provider manager
    pub storage_manager: Arc<StorageManager>,

    // ── Services ─────────────────────────────────────────────
    /// Attachment service
    pub attachments: Arc<AttachmentService>,

    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Wire the state from a metadata store and a storage manager.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn FileRecordStore>,
        storage_manager: Arc<StorageManager>,
    ) -> Self {
        let attachments = Arc::new(AttachmentService::new(
            store,
            Arc::clone(&storage_manager),
            config.ingest.clone(),
            Some(config.storage.max_upload_size_bytes),
        ));
        Self {
            config: Arc::new(config),
            storage_manager,
            attachments,
            started_at: Instant::now(),
        }
    }

    /// State backed by an in-memory store and in-memory storage.
    pub async fn in_memory(config: AppConfig) -> Self {
        let storage = StorageManager::new(config.storage.bucket.clone());
        storage
            .register(
                config.storage.bucket.clone(),
                Arc::new(MemoryStorageProvider::new()),
            )
            .await;
        Self::new(
            config,
            Arc::new(InMemoryFileRecordStore::new()),
            Arc::new(storage),
        )
    }
}
