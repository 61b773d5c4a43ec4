//! Opens the stored object of a file record, with one fallback location.

use std::sync::Arc;

use tracing::{debug, warn};

use attach_core::traits::storage::ByteStream;
use attach_entity::file::FileRecord;
use attach_storage::StorageManager;

use crate::error::FileFailure;
use crate::ingest::key::{canonical_encode, canonical_key};

/// An opened object.
pub struct ResolvedFile {
    /// Object contents.
    pub stream: ByteStream,
    /// Key the object was read from.
    pub key: String,
    /// Whether the fallback key was used.
    pub used_fallback: bool,
}

impl std::fmt::Debug for ResolvedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedFile")
            .field("key", &self.key)
            .field("used_fallback", &self.used_fallback)
            .finish()
    }
}

/// Key derived from the stored record.
pub fn primary_key(record: &FileRecord) -> String {
    canonical_key(&record.storage_key)
}

/// Key derived from the owning article and the display name.
pub fn fallback_key(record: &FileRecord) -> String {
    format!(
        "{}/{}",
        record.article_id,
        canonical_encode(&record.original_name)
    )
}

/// Resolves file records to object streams.
#[derive(Debug, Clone)]
pub struct RetrievalResolver {
    /// Storage manager.
    storage: Arc<StorageManager>,
}

impl RetrievalResolver {
    /// Creates a new retrieval resolver.
    pub fn new(storage: Arc<StorageManager>) -> Self {
        Self { storage }
    }

    /// Open the object of `record`.
    ///
    /// Tries the primary key, then the fallback key once. Never makes more
    /// than two read attempts.
    pub async fn open(&self, record: &FileRecord) -> Result<ResolvedFile, FileFailure> {
        let primary = primary_key(record);
        let fallback = fallback_key(record);
        let failure = |cause: String| FileFailure::Retrieval {
            name: record.original_name.clone(),
            primary_key: primary.clone(),
            fallback_key: fallback.clone(),
            cause,
        };

        let provider = self
            .storage
            .get(&record.bucket)
            .await
            .map_err(|e| failure(e.to_string()))?;

        match provider.read(&primary).await {
            Ok(stream) => {
                return Ok(ResolvedFile {
                    stream,
                    key: primary.clone(),
                    used_fallback: false,
                });
            }
            Err(e) => {
                debug!(
                    record_id = %record.id,
                    key = %primary,
                    error = %e,
                    "Primary key failed, trying fallback"
                );
            }
        }

        match provider.read(&fallback).await {
            Ok(stream) => Ok(ResolvedFile {
                stream,
                key: fallback.clone(),
                used_fallback: true,
            }),
            Err(e) => {
                warn!(
                    record_id = %record.id,
                    primary_key = %primary,
                    fallback_key = %fallback,
                    error = %e,
                    "Attachment could not be retrieved"
                );
                Err(failure(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::TryStreamExt;
    use uuid::Uuid;

    use attach_core::result::AppResult;
    use attach_core::traits::storage::{StorageObjectMeta, StorageProvider};
    use attach_storage::providers::MemoryStorageProvider;

    use super::*;

    /// Memory provider that counts read attempts.
    #[derive(Debug, Default)]
    struct CountingProvider {
        inner: MemoryStorageProvider,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl StorageProvider for CountingProvider {
        fn provider_type(&self) -> &str {
            "counting"
        }
        async fn health_check(&self) -> AppResult<bool> {
            Ok(true)
        }
        async fn read(&self, key: &str) -> AppResult<ByteStream> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read(key).await
        }
        async fn write(&self, key: &str, data: Bytes) -> AppResult<()> {
            self.inner.write(key, data).await
        }
        async fn delete(&self, key: &str) -> AppResult<()> {
            self.inner.delete(key).await
        }
        async fn list(&self, prefix: &str) -> AppResult<Vec<StorageObjectMeta>> {
            self.inner.list(prefix).await
        }
    }

    fn record(storage_key: &str, name: &str) -> FileRecord {
        FileRecord {
            id: Uuid::new_v4(),
            article_id: "39dab4d8-f600-4c1e-9a51-0c7d2b1e8f00".parse().unwrap(),
            original_name: name.to_string(),
            virtual_path: String::new(),
            bucket: "attachments".to_string(),
            storage_key: storage_key.to_string(),
            size_bytes: 0,
            content_type: "text/plain".to_string(),
            created_at: chrono::Utc::now(),
        }
    }

    async fn resolver() -> (RetrievalResolver, Arc<CountingProvider>) {
        let provider = Arc::new(CountingProvider::default());
        let storage = StorageManager::new("attachments");
        storage.register("attachments", provider.clone()).await;
        (RetrievalResolver::new(Arc::new(storage)), provider)
    }

    async fn collect(stream: ByteStream) -> Vec<u8> {
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        chunks.concat()
    }

    #[tokio::test]
    async fn test_primary_key_is_canonically_encoded() {
        let (resolver, provider) = resolver().await;
        provider
            .inner
            .write("art/1_my%20file.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        let resolved = resolver
            .open(&record("art/1_my file.txt", "my file.txt"))
            .await
            .unwrap();
        assert!(!resolved.used_fallback);
        assert_eq!(resolved.key, "art/1_my%20file.txt");
        assert_eq!(collect(resolved.stream).await, b"hello");
        assert_eq!(provider.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exactly_one_fallback_attempt() {
        let (resolver, provider) = resolver().await;
        provider
            .inner
            .write(
                "39dab4d8-f600-4c1e-9a51-0c7d2b1e8f00/legacy%20name.stl",
                Bytes::from_static(b"solid"),
            )
            .await
            .unwrap();

        let resolved = resolver
            .open(&record("missing/1_x.stl", "legacy name.stl"))
            .await
            .unwrap();
        assert!(resolved.used_fallback);
        assert_eq!(collect(resolved.stream).await, b"solid");
        assert_eq!(provider.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_names_both_keys() {
        let (resolver, provider) = resolver().await;

        let err = resolver
            .open(&record("missing/1_x.stl", "x.stl"))
            .await
            .unwrap_err();
        assert_eq!(provider.reads.load(Ordering::SeqCst), 2);
        match err {
            FileFailure::Retrieval {
                primary_key,
                fallback_key,
                ..
            } => {
                assert_eq!(primary_key, "missing/1_x.stl");
                assert_eq!(fallback_key, "39dab4d8-f600-4c1e-9a51-0c7d2b1e8f00/x.stl");
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }
}
