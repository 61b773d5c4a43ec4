//! # attach-entity
//!
//! Domain entity models for article attachments. Persisted records derive
//! `sqlx::FromRow`; derived values such as the folder tree and upload
//! entries are plain value objects.

pub mod file;
pub mod folder;
