//! Storage manager: routes operations to the provider serving a bucket.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use attach_core::config::{StorageConfig, StorageProviderKind};
use attach_core::error::AppError;
use attach_core::result::AppResult;
use attach_core::traits::storage::StorageProvider;

use crate::providers::{LocalStorageProvider, MemoryStorageProvider};

/// Central storage manager holding one provider per bucket.
#[derive(Debug, Clone)]
pub struct StorageManager {
    /// Map of bucket name → provider instance.
    providers: Arc<RwLock<HashMap<String, Arc<dyn StorageProvider>>>>,
    /// Bucket that receives new uploads.
    default_bucket: String,
}

impl StorageManager {
    /// Create an empty manager whose uploads go to `default_bucket`.
    pub fn new(default_bucket: impl Into<String>) -> Self {
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
            default_bucket: default_bucket.into(),
        }
    }

    /// Build a manager with the provider configured for the upload bucket.
    pub async fn from_config(config: &StorageConfig) -> AppResult<Self> {
        let manager = Self::new(config.bucket.clone());
        let provider: Arc<dyn StorageProvider> = match config.provider {
            StorageProviderKind::Local => Arc::new(
                LocalStorageProvider::new(Path::new(&config.local.root_path).join(&config.bucket))
                    .await?,
            ),
            StorageProviderKind::Memory => Arc::new(MemoryStorageProvider::new()),
            #[cfg(feature = "s3")]
            StorageProviderKind::S3 => Arc::new(
                crate::providers::S3StorageProvider::new(&config.s3, &config.bucket).await?,
            ),
            #[cfg(not(feature = "s3"))]
            StorageProviderKind::S3 => {
                return Err(AppError::configuration(
                    "storage.provider = \"s3\" requires the `s3` feature of attach-storage",
                ));
            }
        };

        info!(
            bucket = %config.bucket,
            provider = provider.provider_type(),
            "Registered storage provider"
        );
        manager.register(config.bucket.clone(), provider).await;
        Ok(manager)
    }

    /// Register (or replace) the provider serving a bucket.
    pub async fn register(&self, bucket: impl Into<String>, provider: Arc<dyn StorageProvider>) {
        self.providers.write().await.insert(bucket.into(), provider);
    }

    /// Get the provider serving a bucket.
    pub async fn get(&self, bucket: &str) -> AppResult<Arc<dyn StorageProvider>> {
        self.providers
            .read()
            .await
            .get(bucket)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Bucket {bucket} not found")))
    }

    /// Name of the bucket new uploads are written to.
    pub fn default_bucket(&self) -> &str {
        &self.default_bucket
    }

    /// Provider of the upload bucket.
    pub async fn get_default(&self) -> AppResult<Arc<dyn StorageProvider>> {
        self.get(&self.default_bucket).await
    }

    /// List all registered bucket names.
    pub async fn buckets(&self) -> Vec<String> {
        let mut buckets: Vec<String> = self.providers.read().await.keys().cloned().collect();
        buckets.sort();
        buckets
    }

    /// Check health of all registered providers.
    pub async fn health_check_all(&self) -> HashMap<String, bool> {
        let providers: Vec<(String, Arc<dyn StorageProvider>)> = self
            .providers
            .read()
            .await
            .iter()
            .map(|(bucket, provider)| (bucket.clone(), Arc::clone(provider)))
            .collect();

        let mut results = HashMap::new();
        for (bucket, provider) in providers {
            let healthy = provider.health_check().await.unwrap_or(false);
            results.insert(bucket, healthy);
        }
        results
    }
}
