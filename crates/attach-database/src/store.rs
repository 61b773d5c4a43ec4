//! Metadata store abstraction for attachment file records.

use async_trait::async_trait;
use uuid::Uuid;

use attach_core::result::AppResult;
use attach_entity::file::{CreateFileRecord, FileRecord};

/// Persistence operations for [`FileRecord`]s.
///
/// `(bucket, storage_key)` is unique across all records; inserting a
/// duplicate pair fails with a `Conflict` error.
#[async_trait]
pub trait FileRecordStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a new record and return it with its assigned id.
    async fn create(&self, data: CreateFileRecord) -> AppResult<FileRecord>;

    /// Find a record by id.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<FileRecord>>;

    /// Find the record pointing at the given object.
    async fn find_by_storage_key(&self, bucket: &str, key: &str)
    -> AppResult<Option<FileRecord>>;

    /// List every record of an article, ordered by virtual path then creation time.
    async fn list_by_article(&self, article_id: Uuid) -> AppResult<Vec<FileRecord>>;

    /// Delete one record. Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Check whether the store is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
