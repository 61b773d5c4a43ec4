//! Upload orchestration: validate, optionally replace, then store a batch.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use attach_core::ArticleId;
use attach_core::config::{DeleteFailurePolicy, IngestConfig, OrphanPolicy, ReplaceAllScope};
use attach_core::error::AppError;
use attach_core::result::AppResult;
use attach_database::store::FileRecordStore;
use attach_entity::file::{CreateFileRecord, FileRecord, PendingUpload, UploadEntry};
use attach_storage::StorageManager;

use crate::error::FileFailure;
use crate::retrieval::content_type::content_type_for;

use super::key::{BatchFolderPattern, StorageKeyAllocator, canonical_key, virtual_path};
use super::sanitizer::{PathSanitizer, RejectReason};

/// Per-call ingestion options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOptions {
    /// Delete the article's prior attachments before storing the batch.
    pub replace_all: bool,
}

/// A file dropped from the batch with a warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    /// Display name of the file.
    pub name: String,
    /// Relative path within the selection, if any.
    pub relative_path: Option<String>,
    /// Why it was dropped.
    pub reason: RejectReason,
}

/// A prior record that could not be cleanly removed during replace-all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovalFailure {
    /// Record id.
    pub record_id: Uuid,
    /// Storage key of its object.
    pub storage_key: String,
    /// Underlying error message.
    pub cause: String,
    /// Whether the metadata row was kept for a later retry.
    pub record_retained: bool,
}

/// What happened to every entry of an ingested batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestOutcome {
    /// Records created for stored files.
    pub created: Vec<FileRecord>,
    /// Files dropped with a warning (system files and folders).
    pub skipped: Vec<SkippedEntry>,
    /// Files that failed validation or storage.
    pub failed: Vec<FileFailure>,
    /// Ids of prior records removed by replace-all.
    pub removed_prior: Vec<Uuid>,
    /// Prior records whose removal failed.
    pub removal_failures: Vec<RemovalFailure>,
    /// Ids of already-stored files kept in the selection.
    pub retained: Vec<Uuid>,
}

impl IngestOutcome {
    /// Whether every pending file was stored.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs an upload batch through validation, storage, and metadata writes.
#[derive(Clone)]
pub struct UploadOrchestrator {
    /// Metadata store.
    store: Arc<dyn FileRecordStore>,
    /// Storage manager.
    storage: Arc<StorageManager>,
    /// Name and path validation.
    sanitizer: PathSanitizer,
    /// Key allocation, shared so timestamps stay monotonic across batches.
    allocator: Arc<StorageKeyAllocator>,
    /// Batch container folder label template.
    pattern: BatchFolderPattern,
    /// Ingest policies.
    config: IngestConfig,
}

impl std::fmt::Debug for UploadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadOrchestrator")
            .field("pattern", &self.pattern)
            .field("max_concurrent_uploads", &self.config.max_concurrent_uploads)
            .finish()
    }
}

impl UploadOrchestrator {
    /// Creates a new upload orchestrator.
    pub fn new(
        store: Arc<dyn FileRecordStore>,
        storage: Arc<StorageManager>,
        config: IngestConfig,
        max_file_size: Option<u64>,
    ) -> Self {
        Self {
            store,
            storage,
            sanitizer: PathSanitizer::from_config(&config, max_file_size),
            allocator: Arc::new(StorageKeyAllocator::new()),
            pattern: BatchFolderPattern::from_config(&config),
            config,
        }
    }

    /// The sanitizer applied to every pending entry.
    pub fn sanitizer(&self) -> &PathSanitizer {
        &self.sanitizer
    }

    /// The batch container folder pattern.
    pub fn pattern(&self) -> &BatchFolderPattern {
        &self.pattern
    }

    /// Ingest a batch of entries for an article.
    ///
    /// Fails with a validation error, before any I/O, when an entry has an
    /// invalid or oversized name and `reject_batch_on_invalid` is set.
    /// Otherwise per-file failures are collected in the outcome.
    pub async fn ingest(
        &self,
        article: ArticleId,
        entries: Vec<UploadEntry>,
        options: IngestOptions,
    ) -> AppResult<IngestOutcome> {
        let label = self.pattern.render(article);

        let mut pending = Vec::new();
        let mut existing = Vec::new();
        for entry in entries {
            match entry {
                UploadEntry::Pending(upload) => pending.push(upload),
                UploadEntry::Existing { record_id, .. } => existing.push(record_id),
            }
        }

        let report = self.sanitizer.partition(pending, &label);
        let mut outcome = IngestOutcome::default();
        let mut invalid = Vec::new();
        for rejected in report.rejected {
            let upload = rejected.item;
            if rejected.reason.category().is_error() {
                invalid.push(FileFailure::Validation {
                    name: upload.display_name,
                    relative_path: upload.relative_path,
                    reason: rejected.reason,
                });
            } else {
                warn!(
                    article_id = %article,
                    name = %upload.display_name,
                    reason = %rejected.reason,
                    "Skipping system file"
                );
                outcome.skipped.push(SkippedEntry {
                    name: upload.display_name,
                    relative_path: upload.relative_path,
                    reason: rejected.reason,
                });
            }
        }

        if !invalid.is_empty() && self.config.reject_batch_on_invalid {
            let names: Vec<&str> = invalid.iter().filter_map(FileFailure::file_name).collect();
            return Err(AppError::validation(format!(
                "{} file(s) have invalid names: {}",
                invalid.len(),
                names.join(", ")
            ))
            .with_details(serde_json::to_value(&invalid)?));
        }
        outcome.failed.extend(invalid);

        if options.replace_all {
            self.remove_prior(article, &existing, &mut outcome).await?;
        }
        let removed: HashSet<Uuid> = outcome.removed_prior.iter().copied().collect();
        outcome.retained = existing
            .into_iter()
            .filter(|id| !removed.contains(id))
            .collect();

        let bucket = self.storage.default_bucket().to_string();
        let results: Vec<Result<FileRecord, FileFailure>> = stream::iter(report.accepted)
            .map(|upload| self.store_one(article, &label, &bucket, upload))
            .buffer_unordered(self.config.max_concurrent_uploads.max(1))
            .collect()
            .await;

        for result in results {
            match result {
                Ok(record) => outcome.created.push(record),
                Err(failure) => outcome.failed.push(failure),
            }
        }

        info!(
            article_id = %article,
            created = outcome.created.len(),
            skipped = outcome.skipped.len(),
            failed = outcome.failed.len(),
            removed_prior = outcome.removed_prior.len(),
            retained = outcome.retained.len(),
            "Ingest completed"
        );
        Ok(outcome)
    }

    /// Store one accepted file and record it.
    async fn store_one(
        &self,
        article: ArticleId,
        label: &str,
        bucket: &str,
        upload: PendingUpload,
    ) -> Result<FileRecord, FileFailure> {
        let key = self.allocator.allocate(article, &upload.display_name);
        let storage_failure = |cause: String| FileFailure::StorageWrite {
            name: upload.display_name.clone(),
            key: key.clone(),
            cause,
        };

        let provider = self
            .storage
            .get(bucket)
            .await
            .map_err(|e| storage_failure(e.to_string()))?;
        let size = upload.size();
        provider
            .write(&key, upload.data.clone())
            .await
            .map_err(|e| storage_failure(e.to_string()))?;

        let content_type = upload
            .content_type
            .clone()
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| content_type_for(&upload.display_name).to_string());

        let data = CreateFileRecord {
            article_id: article.into_uuid(),
            original_name: upload.display_name.clone(),
            virtual_path: virtual_path(label, upload.relative_path.as_deref()),
            bucket: bucket.to_string(),
            storage_key: key.clone(),
            size_bytes: i64::try_from(size).unwrap_or(i64::MAX),
            content_type,
        };

        match self.store.create(data).await {
            Ok(record) => Ok(record),
            Err(e) => {
                let object_removed = match self.config.on_metadata_failure {
                    OrphanPolicy::Log => false,
                    OrphanPolicy::RemoveObject => provider.delete(&key).await.is_ok(),
                };
                warn!(
                    article_id = %article,
                    key = %key,
                    object_removed,
                    error = %e,
                    "Stored object has no metadata record"
                );
                Err(FileFailure::MetadataWrite {
                    name: upload.display_name,
                    key,
                    cause: e.to_string(),
                    object_removed,
                })
            }
        }
    }

    /// Delete the article's prior records according to the replace-all policy.
    async fn remove_prior(
        &self,
        article: ArticleId,
        keep: &[Uuid],
        outcome: &mut IngestOutcome,
    ) -> AppResult<()> {
        let policy = &self.config.replace_all;
        let keep: HashSet<Uuid> = match policy.scope {
            ReplaceAllScope::Everything => HashSet::new(),
            ReplaceAllScope::KeepListed => keep.iter().copied().collect(),
        };

        let prior = self.store.list_by_article(article.into_uuid()).await?;
        for record in prior.into_iter().filter(|r| !keep.contains(&r.id)) {
            let deleted = match self.storage.get(&record.bucket).await {
                Ok(provider) => provider.delete(&canonical_key(&record.storage_key)).await,
                Err(e) => Err(e),
            };

            if let Err(e) = deleted {
                let record_retained = policy.on_delete_failure == DeleteFailurePolicy::RetainRecord;
                warn!(
                    article_id = %article,
                    record_id = %record.id,
                    key = %record.storage_key,
                    record_retained,
                    error = %e,
                    "Failed to delete prior attachment object"
                );
                outcome.removal_failures.push(RemovalFailure {
                    record_id: record.id,
                    storage_key: record.storage_key.clone(),
                    cause: e.to_string(),
                    record_retained,
                });
                if record_retained {
                    continue;
                }
            }

            match self.store.delete(record.id).await {
                Ok(_) => outcome.removed_prior.push(record.id),
                Err(e) => {
                    warn!(
                        article_id = %article,
                        record_id = %record.id,
                        error = %e,
                        "Failed to delete prior attachment record"
                    );
                    outcome.removal_failures.push(RemovalFailure {
                        record_id: record.id,
                        storage_key: record.storage_key,
                        cause: e.to_string(),
                        record_retained: true,
                    });
                }
            }
        }
        Ok(())
    }
}
