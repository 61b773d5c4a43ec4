//! # attach-service
//!
//! Business logic for article attachments: sanitizing and ingesting
//! uploaded selections, rebuilding virtual folder trees, resolving stored
//! objects, and streaming scope-limited archives.
//!
//! Services follow constructor injection: the metadata store and the
//! storage manager are provided at construction time via `Arc` references.

pub mod attachment;
pub mod error;
pub mod ingest;
pub mod retrieval;
pub mod tree;

pub use attachment::{AttachmentService, FetchResult, HealthReport, SelectionItem, SelectionPreview};
pub use error::FileFailure;
pub use ingest::{
    BatchFolderPattern, IngestOptions, IngestOutcome, PathSanitizer, RejectCategory,
    RejectReason, SanitizeReport, StorageKeyAllocator, UploadOrchestrator,
};
pub use retrieval::{ArchiveBuilder, ArchiveReport, ArchiveStream, RetrievalResolver};
pub use tree::{build_tree, collapse_batch_folder};
