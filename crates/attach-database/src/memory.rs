//! Process-local file record store.
//!
//! Used for development (`database.backend = "memory"`) and tests. Enforces
//! the same `(bucket, storage_key)` uniqueness as the PostgreSQL schema.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use attach_core::error::AppError;
use attach_core::result::AppResult;
use attach_entity::file::{CreateFileRecord, FileRecord};

use crate::store::FileRecordStore;

/// In-memory [`FileRecordStore`].
#[derive(Debug, Default)]
pub struct InMemoryFileRecordStore {
    records: RwLock<Vec<FileRecord>>,
}

impl InMemoryFileRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl FileRecordStore for InMemoryFileRecordStore {
    async fn create(&self, data: CreateFileRecord) -> AppResult<FileRecord> {
        let mut records = self.records.write().await;
        if records
            .iter()
            .any(|r| r.bucket == data.bucket && r.storage_key == data.storage_key)
        {
            return Err(AppError::conflict(format!(
                "Storage key already recorded: {}/{}",
                data.bucket, data.storage_key
            )));
        }
        let record = data.into_record();
        records.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<FileRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn find_by_storage_key(
        &self,
        bucket: &str,
        key: &str,
    ) -> AppResult<Option<FileRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.bucket == bucket && r.storage_key == key)
            .cloned())
    }

    async fn list_by_article(&self, article_id: Uuid) -> AppResult<Vec<FileRecord>> {
        let mut found: Vec<FileRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.article_id == article_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.virtual_path
                .cmp(&b.virtual_path)
                .then(a.created_at.cmp(&b.created_at))
                .then_with(|| a.original_name.cmp(&b.original_name))
        });
        Ok(found)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() < before)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use attach_core::error::ErrorKind;

    use super::*;

    fn create(article_id: Uuid, name: &str, virtual_path: &str, key: &str) -> CreateFileRecord {
        CreateFileRecord {
            article_id,
            original_name: name.to_string(),
            virtual_path: virtual_path.to_string(),
            bucket: "attachments".to_string(),
            storage_key: key.to_string(),
            size_bytes: 1,
            content_type: "application/octet-stream".to_string(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_key_conflicts() {
        let store = InMemoryFileRecordStore::new();
        let article = Uuid::new_v4();
        store.create(create(article, "a", "", "k/1_a")).await.unwrap();
        let err = store
            .create(create(article, "a", "", "k/1_a"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_ordered() {
        let store = InMemoryFileRecordStore::new();
        let article = Uuid::new_v4();
        let other = Uuid::new_v4();
        store.create(create(article, "b", "l/sub/", "k/2_b")).await.unwrap();
        store.create(create(article, "a", "l/", "k/1_a")).await.unwrap();
        store.create(create(other, "c", "", "o/3_c")).await.unwrap();

        let listed = store.list_by_article(article).await.unwrap();
        let names: Vec<_> = listed.iter().map(|r| r.original_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_delete_one_record() {
        let store = InMemoryFileRecordStore::new();
        let article = Uuid::new_v4();
        let gone = store.create(create(article, "a", "", "k/1_a")).await.unwrap();
        let kept = store.create(create(article, "b", "", "k/2_b")).await.unwrap();

        assert!(store.delete(gone.id).await.unwrap());
        assert!(store.find_by_id(gone.id).await.unwrap().is_none());
        assert!(store.find_by_id(kept.id).await.unwrap().is_some());
        assert!(!store.delete(Uuid::new_v4()).await.unwrap());
    }
}
