//! Single-object download handler.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;

use attach_core::error::AppError;

use crate::error::ApiResult;
use crate::handlers::content_disposition;
use crate::state::AppState;

/// GET /api/storage/{bucket}/objects/{*key}
pub async fn fetch_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> ApiResult<Response> {
    let result = state.attachments.fetch(&bucket, &key).await?;

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, result.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&result.file_name),
        );
    if let Some(size) = result.size_bytes {
        builder = builder.header(header::CONTENT_LENGTH, size);
    }

    let response = builder
        .body(Body::from_stream(result.stream))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")))?;
    Ok(response)
}
