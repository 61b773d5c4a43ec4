//! Custom Axum extractors.

pub mod path;

pub use path::{parse_article_id, parse_uuid};
