//! Storage provider implementations.

pub mod local;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

pub use local::LocalStorageProvider;
pub use memory::MemoryStorageProvider;
#[cfg(feature = "s3")]
pub use s3::S3StorageProvider;

use attach_core::error::AppError;
use attach_core::result::AppResult;

/// Reject keys that could escape the bucket or address nothing.
pub(crate) fn validate_key(key: &str) -> AppResult<&str> {
    let key = key.trim_start_matches('/');
    if key.is_empty() {
        return Err(AppError::validation("Storage key must not be empty"));
    }
    if key
        .split('/')
        .any(|segment| segment == ".." || segment == "." || segment.contains('\\'))
    {
        return Err(AppError::validation(format!("Invalid storage key: {key}")));
    }
    Ok(key)
}
