//! # attach-storage
//!
//! Object storage provider implementations for article attachments.
//! Supports the local filesystem, process memory, and S3-compatible
//! object stores (behind the `s3` feature).

pub mod manager;
pub mod providers;

pub use manager::StorageManager;
