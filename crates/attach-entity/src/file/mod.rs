//! File domain entities.

pub mod model;
pub mod upload;

pub use model::{CreateFileRecord, FileRecord};
pub use upload::{PendingUpload, UploadEntry};
