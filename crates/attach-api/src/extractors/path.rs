//! Typed path parameter helpers.

use uuid::Uuid;

use attach_core::ArticleId;
use attach_core::error::AppError;

/// Parses a UUID from a path segment.
pub fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(s).map_err(|_| AppError::validation(format!("Invalid UUID: {s}")))
}

/// Parses an article id from a path segment.
pub fn parse_article_id(s: &str) -> Result<ArticleId, AppError> {
    parse_uuid(s).map(ArticleId::from_uuid)
}
