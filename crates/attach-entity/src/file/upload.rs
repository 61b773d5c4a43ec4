//! Entries of an upload selection.

use bytes::Bytes;
use uuid::Uuid;

/// A file the client selected but has not uploaded yet.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    /// File contents.
    pub data: Bytes,
    /// Display name of the file.
    pub display_name: String,
    /// Path relative to the selected directory, including the file name
    /// (`sub/b.txt`). `None` for files picked individually.
    pub relative_path: Option<String>,
    /// MIME type reported by the client.
    pub content_type: Option<String>,
}

impl PendingUpload {
    /// Create a pending upload without folder structure.
    pub fn new(display_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            display_name: display_name.into(),
            relative_path: None,
            content_type: None,
        }
    }

    /// Set the relative path of the file within the selection.
    pub fn with_relative_path(mut self, relative_path: impl Into<String>) -> Self {
        self.relative_path = Some(relative_path.into());
        self
    }

    /// Set the client-reported content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Size of the contents in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// One entry of an upload batch.
#[derive(Debug, Clone)]
pub enum UploadEntry {
    /// A new file to store.
    Pending(PendingUpload),
    /// A file stored by an earlier upload, kept in the selection.
    Existing {
        /// Record id of the stored file.
        record_id: Uuid,
        /// Its virtual path, for display.
        virtual_path: String,
    },
}
