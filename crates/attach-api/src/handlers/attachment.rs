//! Attachment ingest, preview, listing, tree, and delete handlers.

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use tracing::debug;

use attach_core::error::AppError;
use attach_entity::file::{FileRecord, PendingUpload, UploadEntry};
use attach_entity::folder::FolderNode;
use attach_service::{IngestOptions, IngestOutcome, SelectionItem, SelectionPreview};

use crate::dto::request::{PreviewRequest, validate_request};
use crate::dto::response::ApiResponse;
use crate::error::ApiResult;
use crate::extractors::{parse_article_id, parse_uuid};
use crate::state::AppState;

/// POST /api/articles/{article_id}/attachments
///
/// Multipart batch upload. Parts: `file` (repeated), an optional `relative_path` text part sent
/// before the `file` it describes, `keep` record ids, and `replace_all`.
pub async fn ingest(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ApiResponse<IngestOutcome>>)> {
    let article = parse_article_id(&article_id)?;
    let mut entries = Vec::new();
    let mut next_relative_path: Option<String> = None;
    let mut replace_all = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "relative_path" => {
                let text = read_text(field).await?;
                next_relative_path = Some(text).filter(|p| !p.is_empty());
            }
            "file" => {
                let file_name = field
                    .file_name()
                    .map(String::from)
                    .ok_or_else(|| AppError::validation("File part without a file name"))?;
                let content_type = field.content_type().map(String::from);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Read error: {e}")))?;

                // Directory uploads may put the relative path in the file name.
                let display_name = match file_name.rsplit_once('/') {
                    Some((_, last)) => last.to_string(),
                    None => file_name.clone(),
                };
                let mut relative_path = next_relative_path.take();
                if file_name.contains('/') {
                    relative_path.get_or_insert(file_name);
                }

                let mut upload = PendingUpload::new(display_name, data);
                if let Some(relative_path) = relative_path {
                    upload = upload.with_relative_path(relative_path);
                }
                if let Some(content_type) = content_type {
                    upload = upload.with_content_type(content_type);
                }
                entries.push(UploadEntry::Pending(upload));
            }
            "keep" => {
                let id = parse_uuid(read_text(field).await?.trim())?;
                let record = state.attachments.get(id).await?;
                if record.article_id != article.into_uuid() {
                    return Err(AppError::validation(format!(
                        "Attachment {id} does not belong to article {article}"
                    ))
                    .into());
                }
                entries.push(UploadEntry::Existing {
                    record_id: record.id,
                    virtual_path: record.virtual_path,
                });
            }
            "replace_all" => {
                let text = read_text(field).await?;
                replace_all = matches!(text.trim(), "true" | "1" | "on" | "yes");
            }
            other => debug!(field = %other, "Ignoring unknown multipart field"),
        }
    }

    if entries.is_empty() {
        return Err(AppError::validation("No files in upload").into());
    }

    let outcome = state
        .attachments
        .ingest(article, entries, IngestOptions { replace_all })
        .await?;
    let status = if outcome.is_complete() {
        StatusCode::CREATED
    } else {
        StatusCode::MULTI_STATUS
    };
    Ok((status, Json(ApiResponse::ok(outcome))))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::validation(format!("Read error: {e}")))
}

/// POST /api/articles/{article_id}/attachments/preview
pub async fn preview(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
    Json(req): Json<PreviewRequest>,
) -> ApiResult<Json<ApiResponse<SelectionPreview>>> {
    let article = parse_article_id(&article_id)?;
    validate_request(&req)?;

    let items: Vec<SelectionItem> = req.items.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::ok(state.attachments.preview(article, items))))
}

/// GET /api/articles/{article_id}/attachments
pub async fn list(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<FileRecord>>>> {
    let article = parse_article_id(&article_id)?;
    let records = state.attachments.list(article).await?;
    Ok(Json(ApiResponse::ok(records)))
}

/// GET /api/articles/{article_id}/attachments/tree
pub async fn tree(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
) -> ApiResult<Json<ApiResponse<FolderNode<FileRecord>>>> {
    let article = parse_article_id(&article_id)?;
    let tree = state.attachments.tree(article).await?;
    Ok(Json(ApiResponse::ok(tree)))
}

/// DELETE /api/attachments/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<FileRecord>>> {
    let id = parse_uuid(&id)?;
    let record = state.attachments.delete(id).await?;
    Ok(Json(ApiResponse::ok(record)))
}
