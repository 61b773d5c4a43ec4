//! Retrieval of stored attachments as single files or archives.

pub mod archive;
pub mod content_type;
pub mod resolver;

pub use archive::{ArchiveBuilder, ArchiveEntry, ArchiveReport, ArchiveStream};
pub use content_type::content_type_for;
pub use resolver::{ResolvedFile, RetrievalResolver};
