//! Storage provider trait for pluggable object storage backends.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;

/// Metadata about a stored object, as returned by [`StorageProvider::list`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StorageObjectMeta {
    /// Key of the object within its bucket.
    pub key: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Last modified timestamp, when the backend reports one.
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

/// A byte stream type used for reading object contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Trait for object storage backends.
///
/// One provider serves one bucket. Keys are `/`-separated and never start
/// with a slash. Implementations live in `attach-storage`.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "s3").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Open an object and return its byte stream.
    ///
    /// A missing object is a `NotFound` error.
    async fn read(&self, key: &str) -> AppResult<ByteStream>;

    /// Read an object into memory.
    async fn read_bytes(&self, key: &str) -> AppResult<Bytes>;

    /// Write bytes to the given key, replacing any existing object.
    async fn write(&self, key: &str, data: Bytes) -> AppResult<()>;

    /// Write a byte stream to the given key. Returns the number of bytes written.
    async fn write_stream(&self, key: &str, stream: ByteStream) -> AppResult<u64>;

    /// Delete the object at the given key. Deleting a missing object succeeds.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check whether an object exists at the given key.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// List every object whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> AppResult<Vec<StorageObjectMeta>>;
}
