//! Object storage configuration.

use serde::{Deserialize, Serialize};

/// Which object storage backend holds attachment bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageProviderKind {
    /// Local filesystem under `local.root_path/{bucket}`.
    Local,
    /// Process-local memory; for development and tests.
    Memory,
    /// S3-compatible object store (requires the `s3` feature).
    S3,
}

/// Top-level storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend for the attachment bucket.
    #[serde(default = "default_provider")]
    pub provider: StorageProviderKind,
    /// Bucket that new uploads are written to.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Maximum size of a single attachment in bytes (default 512 MB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
    /// Local filesystem storage configuration.
    #[serde(default)]
    pub local: LocalStorageConfig,
    /// S3-compatible storage configuration.
    #[serde(default)]
    pub s3: S3StorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            bucket: default_bucket(),
            max_upload_size_bytes: default_max_upload(),
            local: LocalStorageConfig::default(),
            s3: S3StorageConfig::default(),
        }
    }
}

/// Local filesystem storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    /// Root path; each bucket becomes a sub-directory.
    #[serde(default = "default_local_root")]
    pub root_path: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_local_root(),
        }
    }
}

/// S3-compatible object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3StorageConfig {
    /// S3 endpoint URL (for non-AWS services like MinIO). Empty uses AWS.
    #[serde(default)]
    pub endpoint: String,
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Access key ID. Empty falls back to the default credential chain.
    #[serde(default)]
    pub access_key: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_key: String,
    /// Use path-style addressing (needed by most self-hosted services).
    #[serde(default)]
    pub force_path_style: bool,
}

impl Default for S3StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: default_region(),
            access_key: String::new(),
            secret_key: String::new(),
            force_path_style: false,
        }
    }
}

fn default_provider() -> StorageProviderKind {
    StorageProviderKind::Local
}

fn default_bucket() -> String {
    "attachments".to_string()
}

fn default_max_upload() -> u64 {
    536_870_912 // 512 MB
}

fn default_local_root() -> String {
    "./data/storage".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}
