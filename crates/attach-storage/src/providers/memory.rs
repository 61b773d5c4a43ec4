//! In-memory storage provider for development and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use tokio::sync::RwLock;

use attach_core::error::AppError;
use attach_core::result::AppResult;
use attach_core::traits::storage::{ByteStream, StorageObjectMeta, StorageProvider};

use super::validate_key;

/// Chunk size used when streaming objects back out.
const READ_CHUNK_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: chrono::DateTime<chrono::Utc>,
}

/// Storage provider that keeps objects in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorageProvider {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryStorageProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether no objects are stored.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    async fn get(&self, key: &str) -> AppResult<Bytes> {
        let key = validate_key(key)?;
        self.objects
            .read()
            .await
            .get(key)
            .map(|object| object.data.clone())
            .ok_or_else(|| AppError::not_found(format!("Object not found: {key}")))
    }
}

#[async_trait]
impl StorageProvider for MemoryStorageProvider {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn read(&self, key: &str) -> AppResult<ByteStream> {
        let data = self.get(key).await?;
        let chunks: Vec<Result<Bytes, std::io::Error>> = (0..data.len())
            .step_by(READ_CHUNK_SIZE)
            .map(|start| Ok(data.slice(start..(start + READ_CHUNK_SIZE).min(data.len()))))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn write(&self, key: &str, data: Bytes) -> AppResult<()> {
        let key = validate_key(key)?;
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                last_modified: chrono::Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let key = validate_key(key)?;
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<StorageObjectMeta>> {
        let prefix = prefix.trim_start_matches('/');
        Ok(self
            .objects
            .read()
            .await
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| StorageObjectMeta {
                key: key.clone(),
                size_bytes: object.data.len() as u64,
                last_modified: Some(object.last_modified),
            })
            .collect())
    }
}
