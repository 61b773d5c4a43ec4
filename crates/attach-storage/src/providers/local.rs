//! Local filesystem storage provider.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;

use attach_core::error::{AppError, ErrorKind};
use attach_core::result::AppResult;
use attach_core::traits::storage::{ByteStream, StorageObjectMeta, StorageProvider};

use super::validate_key;

/// Local filesystem storage provider serving one bucket directory.
#[derive(Debug, Clone)]
pub struct LocalStorageProvider {
    /// Bucket directory; every key resolves below it.
    root: PathBuf,
}

impl LocalStorageProvider {
    /// Create a provider rooted at `root_path`, creating the directory if needed.
    pub async fn new(root_path: impl AsRef<Path>) -> AppResult<Self> {
        let root = root_path.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// Resolve a key to an absolute path within the root.
    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        Ok(self.root.join(validate_key(key)?))
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    fn open_error(key: &str, e: std::io::Error) -> AppError {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::with_source(ErrorKind::NotFound, format!("Object not found: {key}"), e)
        } else {
            AppError::with_source(ErrorKind::Storage, format!("Failed to open object: {key}"), e)
        }
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false))
    }

    async fn read(&self, key: &str) -> AppResult<ByteStream> {
        let full_path = self.resolve(key)?;
        let file = fs::File::open(&full_path)
            .await
            .map_err(|e| Self::open_error(key, e))?;

        let stream = ReaderStream::new(file);
        Ok(Box::pin(stream))
    }

    async fn write(&self, key: &str, data: Bytes) -> AppResult<()> {
        let full_path = self.resolve(key)?;
        self.ensure_parent(&full_path).await?;

        fs::write(&full_path, &data).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write object: {key}"),
                e,
            )
        })?;

        debug!(key, bytes = data.len(), "Wrote object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let full_path = self.resolve(key)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete object: {key}"),
                e,
            )),
        }
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<StorageObjectMeta>> {
        let prefix = prefix.trim_start_matches('/');
        // Walk only the deepest directory the prefix fully names.
        let start_dir = match prefix.rfind('/') {
            Some(pos) => self.root.join(validate_key(&prefix[..pos])?),
            None => self.root.clone(),
        };

        let mut objects = Vec::new();
        let mut pending = vec![start_dir];
        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to list directory: {}", dir.display()),
                        e,
                    ));
                }
            };

            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to read directory entry", e)
            })? {
                let meta = entry.metadata().await.map_err(|e| {
                    AppError::with_source(ErrorKind::Storage, "Failed to get entry metadata", e)
                })?;
                let path = entry.path();
                if meta.is_dir() {
                    pending.push(path);
                    continue;
                }

                let Ok(relative) = path.strip_prefix(&self.root) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if !key.starts_with(prefix) {
                    continue;
                }

                objects.push(StorageObjectMeta {
                    key,
                    size_bytes: meta.len(),
                    last_modified: meta.modified().ok().map(chrono::DateTime::from),
                });
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}
