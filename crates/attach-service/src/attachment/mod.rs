//! Attachment operations exposed to the API and CLI.

pub mod service;

pub use service::{AttachmentService, FetchResult, HealthReport, SelectionItem, SelectionPreview};
