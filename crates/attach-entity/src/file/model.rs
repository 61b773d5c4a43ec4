//! Attachment file record model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One stored attachment of an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// The owning article.
    pub article_id: Uuid,
    /// The display name chosen by the uploader.
    pub original_name: String,
    /// Folder path shown to readers, with a trailing slash. Empty for the root.
    pub virtual_path: String,
    /// Bucket holding the object.
    pub bucket: String,
    /// Physical key of the object within its bucket.
    pub storage_key: String,
    /// Object size in bytes.
    pub size_bytes: i64,
    /// MIME type recorded at upload.
    pub content_type: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    /// Virtual path plus display name, e.g. `39dab4d8_f600/sub/b.txt`.
    pub fn display_path(&self) -> String {
        format!("{}{}", self.virtual_path, self.original_name)
    }
}

/// Data required to create a new file record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFileRecord {
    /// The owning article.
    pub article_id: Uuid,
    /// Display name.
    pub original_name: String,
    /// Folder path with a trailing slash.
    pub virtual_path: String,
    /// Bucket holding the object.
    pub bucket: String,
    /// Physical key of the object.
    pub storage_key: String,
    /// Object size in bytes.
    pub size_bytes: i64,
    /// MIME type.
    pub content_type: String,
}

impl CreateFileRecord {
    /// Materialize the record with a fresh id and the current time.
    pub fn into_record(self) -> FileRecord {
        FileRecord {
            id: Uuid::new_v4(),
            article_id: self.article_id,
            original_name: self.original_name,
            virtual_path: self.virtual_path,
            bucket: self.bucket,
            storage_key: self.storage_key,
            size_bytes: self.size_bytes,
            content_type: self.content_type,
            created_at: Utc::now(),
        }
    }
}
