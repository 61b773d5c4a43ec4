//! Attachment façade used by the HTTP and CLI surfaces.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use attach_core::ArticleId;
use attach_core::config::{DeleteFailurePolicy, IngestConfig};
use attach_core::error::AppError;
use attach_core::result::AppResult;
use attach_core::traits::storage::{ByteStream, StorageObjectMeta};
use attach_database::store::FileRecordStore;
use attach_entity::file::{FileRecord, UploadEntry};
use attach_entity::folder::FolderNode;
use attach_storage::StorageManager;

use crate::ingest::key::{canonical_key, name_from_key};
use crate::ingest::orchestrator::{IngestOptions, IngestOutcome, UploadOrchestrator};
use crate::ingest::sanitizer::{CategoryCounts, Rejected, SanitizeCandidate};
use crate::retrieval::archive::{ArchiveBuilder, ArchiveStream};
use crate::retrieval::content_type::content_type_for;
use crate::retrieval::resolver::RetrievalResolver;
use crate::tree::builder::{build_tree, collapse_batch_folder, tree_from_records};

/// One file of a client selection, before upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionItem {
    /// Display name.
    pub name: String,
    /// Path relative to the selected directory, including the name.
    #[serde(default)]
    pub relative_path: Option<String>,
    /// Size in bytes, when the client reports it.
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

impl SanitizeCandidate for SelectionItem {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn relative_path(&self) -> Option<&str> {
        self.relative_path.as_deref()
    }

    fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }
}

/// How a selection would be ingested.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionPreview {
    /// Tree of the files that would be accepted.
    pub tree: FolderNode<SelectionItem>,
    /// Files that would be dropped or refused.
    pub rejected: Vec<Rejected<SelectionItem>>,
    /// Rejections per category.
    pub counts: CategoryCounts,
    /// Whether the upload would be refused outright.
    pub blocked: bool,
}

/// An opened single file.
pub struct FetchResult {
    /// File contents.
    pub stream: ByteStream,
    /// Suggested download name.
    pub file_name: String,
    /// Content type derived from the name.
    pub content_type: &'static str,
    /// Size in bytes, when the object was read from its recorded key.
    pub size_bytes: Option<u64>,
    /// The matching record, if any.
    pub record: Option<FileRecord>,
}

impl std::fmt::Debug for FetchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResult")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

/// Health of the metadata store and every storage bucket.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Whether the metadata store answered.
    pub database: bool,
    /// Health per bucket.
    pub storage: HashMap<String, bool>,
}

impl HealthReport {
    /// Whether every component is healthy.
    pub fn is_healthy(&self) -> bool {
        self.database && self.storage.values().all(|healthy| *healthy)
    }
}

/// Entry point for every attachment operation.
#[derive(Debug, Clone)]
pub struct AttachmentService {
    /// Metadata store.
    store: Arc<dyn FileRecordStore>,
    /// Storage manager.
    storage: Arc<StorageManager>,
    /// Upload pipeline.
    orchestrator: UploadOrchestrator,
    /// Single-file resolution.
    resolver: RetrievalResolver,
    /// Archive assembly.
    archives: ArchiveBuilder,
    /// What to do when an object cannot be deleted.
    on_delete_failure: DeleteFailurePolicy,
    /// Whether invalid names refuse the whole batch.
    reject_batch_on_invalid: bool,
}

impl AttachmentService {
    /// Creates a new attachment service.
    pub fn new(
        store: Arc<dyn FileRecordStore>,
        storage: Arc<StorageManager>,
        config: IngestConfig,
        max_file_size: Option<u64>,
    ) -> Self {
        let resolver = RetrievalResolver::new(Arc::clone(&storage));
        let archives = ArchiveBuilder::new(Arc::clone(&store), resolver.clone());
        let on_delete_failure = config.replace_all.on_delete_failure;
        let reject_batch_on_invalid = config.reject_batch_on_invalid;
        let orchestrator = UploadOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&storage),
            config,
            max_file_size,
        );
        Self {
            store,
            storage,
            orchestrator,
            resolver,
            archives,
            on_delete_failure,
            reject_batch_on_invalid,
        }
    }

    /// Batch container folder label of an article.
    pub fn batch_label(&self, article: ArticleId) -> String {
        self.orchestrator.pattern().render(article)
    }

    /// Store a batch of uploaded files.
    pub async fn ingest(
        &self,
        article: ArticleId,
        entries: Vec<UploadEntry>,
        options: IngestOptions,
    ) -> AppResult<IngestOutcome> {
        self.orchestrator.ingest(article, entries, options).await
    }

    /// Show how a selection would be stored, without any I/O.
    pub fn preview(&self, article: ArticleId, items: Vec<SelectionItem>) -> SelectionPreview {
        let label = self.batch_label(article);
        let report = self.orchestrator.sanitizer().partition(items, &label);
        let tree = build_tree(report.accepted.into_iter().map(|item| {
            let folder = item
                .relative_path
                .as_deref()
                .and_then(|path| path.rsplit_once('/'))
                .map(|(folder, _)| folder.to_string())
                .unwrap_or_default();
            (folder, item)
        }));
        SelectionPreview {
            tree,
            blocked: self.reject_batch_on_invalid && report.counts.errors() > 0,
            rejected: report.rejected,
            counts: report.counts,
        }
    }

    /// List an article's attachments ordered by virtual path.
    pub async fn list(&self, article: ArticleId) -> AppResult<Vec<FileRecord>> {
        self.store.list_by_article(article.into_uuid()).await
    }

    /// Folder tree of an article's attachments, with the batch container
    /// folder collapsed.
    pub async fn tree(&self, article: ArticleId) -> AppResult<FolderNode<FileRecord>> {
        let records = self.list(article).await?;
        Ok(collapse_batch_folder(
            tree_from_records(records),
            &self.batch_label(article),
        ))
    }

    /// Open one object by bucket and key.
    ///
    /// When a record matches the key, its display name is used and the
    /// fallback location is tried. Otherwise the object is read directly and
    /// named after the key.
    pub async fn fetch(&self, bucket: &str, key: &str) -> AppResult<FetchResult> {
        let key = key.trim_start_matches('/');
        let canonical = canonical_key(key);

        let mut record = self.store.find_by_storage_key(bucket, key).await?;
        if record.is_none() && canonical != key {
            record = self.store.find_by_storage_key(bucket, &canonical).await?;
        }

        match record {
            Some(record) => {
                let resolved = self.resolver.open(&record).await?;
                let size_bytes = if resolved.used_fallback {
                    None
                } else {
                    u64::try_from(record.size_bytes).ok()
                };
                Ok(FetchResult {
                    stream: resolved.stream,
                    file_name: record.original_name.clone(),
                    content_type: content_type_for(&record.original_name),
                    size_bytes,
                    record: Some(record),
                })
            }
            None => {
                let provider = self.storage.get(bucket).await?;
                let stream = provider.read(&canonical).await?;
                let file_name = name_from_key(&canonical);
                Ok(FetchResult {
                    stream,
                    content_type: content_type_for(&file_name),
                    file_name,
                    size_bytes: None,
                    record: None,
                })
            }
        }
    }

    /// Start streaming an archive of `article`, limited to `scope`.
    pub async fn archive(&self, article: ArticleId, scope: Option<&str>) -> AppResult<ArchiveStream> {
        self.archives.build(article, scope).await
    }

    /// Look up one attachment by id.
    pub async fn get(&self, id: Uuid) -> AppResult<FileRecord> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Attachment {id} not found")))
    }

    /// Delete one attachment: its object, then its record.
    pub async fn delete(&self, id: Uuid) -> AppResult<FileRecord> {
        let record = self.get(id).await?;

        let provider = self.storage.get(&record.bucket).await?;
        if let Err(e) = provider.delete(&canonical_key(&record.storage_key)).await {
            match self.on_delete_failure {
                DeleteFailurePolicy::RetainRecord => return Err(e),
                DeleteFailurePolicy::DropRecord => warn!(
                    record_id = %id,
                    key = %record.storage_key,
                    error = %e,
                    "Failed to delete attachment object, dropping record anyway"
                ),
            }
        }

        self.store.delete(id).await?;
        info!(
            record_id = %id,
            article_id = %record.article_id,
            name = %record.original_name,
            "Attachment deleted"
        );
        Ok(record)
    }

    /// Objects under the article's key prefix that no record points to.
    pub async fn find_orphans(&self, article: ArticleId) -> AppResult<Vec<StorageObjectMeta>> {
        let bucket = self.storage.default_bucket();
        let provider = self.storage.get(bucket).await?;
        let known: HashSet<String> = self
            .list(article)
            .await?
            .into_iter()
            .filter(|record| record.bucket == bucket)
            .map(|record| canonical_key(&record.storage_key))
            .collect();

        let objects = provider.list(&format!("{article}/")).await?;
        Ok(objects
            .into_iter()
            .filter(|object| !known.contains(&canonical_key(&object.key)))
            .collect())
    }

    /// Delete every orphaned object of an article. Returns the removed keys.
    pub async fn purge_orphans(&self, article: ArticleId) -> AppResult<Vec<String>> {
        let orphans = self.find_orphans(article).await?;
        let provider = self.storage.get_default().await?;

        let mut removed = Vec::with_capacity(orphans.len());
        for orphan in orphans {
            match provider.delete(&orphan.key).await {
                Ok(()) => removed.push(orphan.key),
                Err(e) => warn!(
                    article_id = %article,
                    key = %orphan.key,
                    error = %e,
                    "Failed to delete orphaned object"
                ),
            }
        }
        info!(article_id = %article, removed = removed.len(), "Orphans purged");
        Ok(removed)
    }

    /// Check the metadata store and every storage bucket.
    pub async fn health(&self) -> HealthReport {
        HealthReport {
            database: self.store.health_check().await.unwrap_or(false),
            storage: self.storage.health_check_all().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures::TryStreamExt;

    use attach_core::traits::storage::StorageProvider;
    use attach_database::InMemoryFileRecordStore;
    use attach_entity::file::PendingUpload;
    use attach_storage::providers::MemoryStorageProvider;

    use super::*;

    const ARTICLE: &str = "39dab4d8-f600-4c1e-9a51-0c7d2b1e8f00";

    fn article() -> ArticleId {
        ARTICLE.parse().unwrap()
    }

    async fn service() -> (AttachmentService, Arc<MemoryStorageProvider>) {
        let provider = Arc::new(MemoryStorageProvider::new());
        let storage = StorageManager::new("attachments");
        storage.register("attachments", provider.clone()).await;
        let service = AttachmentService::new(
            Arc::new(InMemoryFileRecordStore::new()),
            Arc::new(storage),
            IngestConfig::default(),
            None,
        );
        (service, provider)
    }

    fn pending(relative_path: &str, body: &'static str) -> UploadEntry {
        let name = relative_path.rsplit('/').next().unwrap_or(relative_path);
        UploadEntry::Pending(PendingUpload::new(name, body).with_relative_path(relative_path))
    }

    async fn read_all(stream: ByteStream) -> Vec<u8> {
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        chunks.concat()
    }

    #[tokio::test]
    async fn test_tree_hides_batch_folder() {
        let (service, _) = service().await;
        service
            .ingest(
                article(),
                vec![pending("a.txt", "a"), pending("sub/b.txt", "b")],
                IngestOptions::default(),
            )
            .await
            .unwrap();

        let tree = service.tree(article()).await.unwrap();
        assert_eq!(tree.files.len(), 1);
        assert_eq!(tree.files[0].original_name, "a.txt");
        assert_eq!(tree.folders["sub"].path, "39dab4d8_f600/sub/");
    }

    #[test]
    fn test_preview_reports_rejections() {
        let service = AttachmentService::new(
            Arc::new(InMemoryFileRecordStore::new()),
            Arc::new(StorageManager::new("attachments")),
            IngestConfig::default(),
            None,
        );
        let item = |path: &str| SelectionItem {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            relative_path: Some(path.to_string()),
            size_bytes: None,
        };

        let preview = service.preview(
            article(),
            vec![item("a.txt"), item("sub/b.txt"), item(".env"), item("sub/.git/c.txt")],
        );
        assert_eq!(preview.tree.file_count(), 2);
        assert!(preview.tree.folders.contains_key("sub"));
        assert_eq!(preview.counts.system_path, 2);
        assert!(!preview.blocked);

        let preview = service.preview(article(), vec![item("bad?.txt")]);
        assert!(preview.blocked);
    }

    #[tokio::test]
    async fn test_fetch_by_key_uses_record_name() {
        let (service, _) = service().await;
        let outcome = service
            .ingest(article(), vec![pending("my model.obj", "v 0 0 0")], IngestOptions::default())
            .await
            .unwrap();
        let record = &outcome.created[0];

        let fetched = service
            .fetch("attachments", &record.storage_key)
            .await
            .unwrap();
        assert_eq!(fetched.file_name, "my model.obj");
        assert_eq!(fetched.content_type, "text/plain");
        assert_eq!(read_all(fetched.stream).await, b"v 0 0 0");
    }

    #[tokio::test]
    async fn test_fetch_without_record_names_file_from_key() {
        let (service, provider) = service().await;
        provider
            .write(
                &format!("{ARTICLE}/1700000000000_part%20one.stl"),
                Bytes::from_static(b"solid"),
            )
            .await
            .unwrap();

        let fetched = service
            .fetch("attachments", &format!("{ARTICLE}/1700000000000_part one.stl"))
            .await
            .unwrap();
        assert!(fetched.record.is_none());
        assert_eq!(fetched.file_name, "part one.stl");
        assert_eq!(fetched.content_type, "application/octet-stream");

        let err = service.fetch("attachments", "nope/1_x.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_removes_object_and_record() {
        let (service, provider) = service().await;
        let outcome = service
            .ingest(article(), vec![pending("a.txt", "a")], IngestOptions::default())
            .await
            .unwrap();
        let id = outcome.created[0].id;

        let deleted = service.delete(id).await.unwrap();
        assert_eq!(deleted.original_name, "a.txt");
        assert!(provider.is_empty().await);
        assert!(service.list(article()).await.unwrap().is_empty());
        assert!(service.delete(id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_orphans_are_found_and_purged() {
        let (service, provider) = service().await;
        service
            .ingest(article(), vec![pending("kept.txt", "k")], IngestOptions::default())
            .await
            .unwrap();
        provider
            .write(&format!("{ARTICLE}/1_stray.txt"), Bytes::from_static(b"s"))
            .await
            .unwrap();

        let orphans = service.find_orphans(article()).await.unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].key, format!("{ARTICLE}/1_stray.txt"));

        let removed = service.purge_orphans(article()).await.unwrap();
        assert_eq!(removed, vec![format!("{ARTICLE}/1_stray.txt")]);
        assert_eq!(provider.len().await, 1);
        assert!(service.find_orphans(article()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_health() {
        let (service, _) = service().await;
        let health = service.health().await;
        assert!(health.is_healthy());
        assert_eq!(health.storage.get("attachments"), Some(&true));
    }
}
