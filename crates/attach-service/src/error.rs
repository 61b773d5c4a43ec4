//! Per-file failure taxonomy for ingestion and retrieval.
//!
//! Batch operations never stop at the first failing file; they collect a
//! [`FileFailure`] per file and report them together.

use serde::Serialize;
use thiserror::Error;

use attach_core::error::{AppError, ErrorKind};

use crate::ingest::sanitizer::RejectReason;

/// Why a single file could not be ingested or retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileFailure {
    /// The name or path was rejected before any I/O.
    #[error("{name} was rejected: {reason}")]
    Validation {
        /// Display name of the file.
        name: String,
        /// Relative path within the selection, if any.
        relative_path: Option<String>,
        /// The rule that rejected it.
        reason: RejectReason,
    },

    /// Writing the object to storage failed. No record was created.
    #[error("Failed to store {name} at {key}: {cause}")]
    StorageWrite {
        /// Display name of the file.
        name: String,
        /// Storage key that was being written.
        key: String,
        /// Underlying error message.
        cause: String,
    },

    /// The object was stored but its metadata record could not be inserted.
    #[error("Stored {name} at {key} but failed to record it: {cause}")]
    MetadataWrite {
        /// Display name of the file.
        name: String,
        /// Storage key of the (possibly orphaned) object.
        key: String,
        /// Underlying error message.
        cause: String,
        /// Whether the orphaned object was deleted again.
        object_removed: bool,
    },

    /// Neither the primary nor the fallback key could be opened.
    #[error("Could not retrieve {name} from {primary_key} or {fallback_key}: {cause}")]
    Retrieval {
        /// Display name of the file.
        name: String,
        /// Key derived from the stored record.
        primary_key: String,
        /// Key derived from the article id and display name.
        fallback_key: String,
        /// Error of the last attempt.
        cause: String,
    },

    /// No file in the archive scope could be retrieved.
    #[error("None of the {attempted} files under '{scope}' could be retrieved")]
    ArchiveAssembly {
        /// Normalized scope.
        scope: String,
        /// Number of files that were tried.
        attempted: usize,
    },
}

impl FileFailure {
    /// Display name of the affected file, when the failure concerns one file.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Validation { name, .. }
            | Self::StorageWrite { name, .. }
            | Self::MetadataWrite { name, .. }
            | Self::Retrieval { name, .. } => Some(name),
            Self::ArchiveAssembly { .. } => None,
        }
    }

    /// The application error kind this failure maps to.
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::StorageWrite { .. } | Self::Retrieval { .. } => ErrorKind::Storage,
            Self::MetadataWrite { .. } => ErrorKind::Database,
            Self::ArchiveAssembly { .. } => ErrorKind::Archive,
        }
    }
}

impl From<FileFailure> for AppError {
    fn from(failure: FileFailure) -> Self {
        let details = serde_json::to_value(&failure).ok();
        let err = AppError::new(failure.error_kind(), failure.to_string());
        match details {
            Some(details) => err.with_details(details),
            None => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_failure_maps_to_archive_kind() {
        let err: AppError = FileFailure::ArchiveAssembly {
            scope: "sub/".to_string(),
            attempted: 2,
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Archive);
        assert_eq!(
            err.details.as_ref().and_then(|d| d["kind"].as_str()),
            Some("archive_assembly")
        );
    }

    #[test]
    fn test_validation_failure_serializes_reason() {
        let failure = FileFailure::Validation {
            name: ".env".to_string(),
            relative_path: None,
            reason: RejectReason::SystemFile,
        };
        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["kind"], "validation");
        assert_eq!(value["reason"]["rule"], "system_file");
        assert_eq!(failure.file_name(), Some(".env"));
    }
}
