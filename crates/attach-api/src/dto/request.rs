//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use attach_core::error::AppError;
use attach_service::SelectionItem;

/// One entry of a selection to preview.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SelectionItemRequest {
    /// Display name.
    #[validate(length(max = 1024, message = "Name is too long"))]
    pub name: String,
    /// Path relative to the selected directory, including the name.
    #[serde(default, alias = "relativePath")]
    #[validate(length(max = 4096, message = "Relative path is too long"))]
    pub relative_path: Option<String>,
    /// Size in bytes.
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

impl From<SelectionItemRequest> for SelectionItem {
    fn from(item: SelectionItemRequest) -> Self {
        Self {
            name: item.name,
            relative_path: item.relative_path.filter(|p| !p.is_empty()),
            size_bytes: item.size_bytes,
        }
    }
}

/// Preview request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PreviewRequest {
    /// The selected files.
    #[validate(length(min = 1, max = 10000, message = "Between 1 and 10000 files"), nested)]
    pub items: Vec<SelectionItemRequest>,
}

/// Query string of the archive endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ArchiveQuery {
    /// Folder scope; empty for the whole article.
    #[validate(length(max = 1024, message = "Scope is too long"))]
    pub scope: Option<String>,
}

/// Validate a request body, mapping failures to a validation error.
pub fn validate_request<T: Validate>(request: &T) -> Result<(), AppError> {
    request.validate().map_err(|errors| {
        let details = serde_json::to_value(&errors).unwrap_or(serde_json::Value::Null);
        AppError::validation(format!("Invalid request: {errors}")).with_details(details)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_request_requires_items() {
        let err = validate_request(&PreviewRequest { items: Vec::new() }).unwrap_err();
        assert!(err.message.contains("items"));
    }

    #[test]
    fn test_camel_case_relative_path_is_accepted() {
        let request: PreviewRequest = serde_json::from_value(serde_json::json!({
            "items": [{"name": "b.txt", "relativePath": "sub/b.txt"}]
        }))
        .unwrap();
        assert!(validate_request(&request).is_ok());
        let item: SelectionItem = request.items[0].clone().into();
        assert_eq!(item.relative_path.as_deref(), Some("sub/b.txt"));
    }

    #[test]
    fn test_scope_length_is_bounded() {
        let query = ArchiveQuery {
            scope: Some("a/".repeat(600)),
        };
        assert!(validate_request(&query).is_err());
    }
}
