//! Upload ingestion: validation, key allocation, and batch orchestration.

pub mod key;
pub mod orchestrator;
pub mod sanitizer;

pub use key::{
    BatchFolderPattern, StorageKeyAllocator, canonical_encode, canonical_key, name_from_key,
    virtual_path,
};
pub use orchestrator::{IngestOptions, IngestOutcome, RemovalFailure, SkippedEntry, UploadOrchestrator};
pub use sanitizer::{
    CategoryCounts, PathSanitizer, RejectCategory, RejectReason, Rejected, SanitizeCandidate,
    SanitizeReport,
};
