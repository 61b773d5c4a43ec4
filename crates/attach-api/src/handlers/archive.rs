//! Archive download handler.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use tokio_util::io::ReaderStream;
use tracing::{error, warn};

use attach_core::error::AppError;
use attach_service::ArchiveStream;

use crate::dto::request::{ArchiveQuery, validate_request};
use crate::error::ApiResult;
use crate::extractors::parse_article_id;
use crate::handlers::content_disposition;
use crate::state::AppState;

/// GET /api/articles/{article_id}/archive?scope=sub/
///
/// Streams the archive while it is being assembled. Closing the connection
/// stops the assembly. Files that cannot be retrieved are left out and named
/// in a `MISSING_FILES.txt` entry at the end of the archive.
pub async fn download_archive(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
    Query(query): Query<ArchiveQuery>,
) -> ApiResult<Response> {
    let article = parse_article_id(&article_id)?;
    validate_request(&query)?;

    let ArchiveStream {
        file_name,
        reader,
        assembly,
        ..
    } = state
        .attachments
        .archive(article, query.scope.as_deref())
        .await?;

    tokio::spawn(async move {
        match assembly.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(article_id = %article, error = %e, "Archive assembly aborted"),
            Err(e) => error!(article_id = %article, error = %e, "Archive assembly task failed"),
        }
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_DISPOSITION, content_disposition(&file_name))
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")))?;
    Ok(response)
}
