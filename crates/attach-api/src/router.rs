//! Route definitions for the attachment HTTP API.
//!
//! All routes are mounted under `/api`. The router receives `AppState` and
//! passes it to all handlers via Axum's `State` extractor.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the Axum router with all routes and request-level middleware.
///
/// Receives the fully-constructed `AppState` and threads it through
/// every route via `.with_state(state)`.
pub fn build_router(state: AppState) -> Router {
    let max_upload = usize::try_from(state.config.storage.max_upload_size_bytes).unwrap_or(usize::MAX);

    let api_routes = Router::new()
        .merge(attachment_routes())
        .merge(storage_routes())
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Article attachments: ingest, preview, list, tree, archive, delete
fn attachment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/articles/{article_id}/attachments",
            get(handlers::attachment::list).post(handlers::attachment::ingest),
        )
        .route(
            "/articles/{article_id}/attachments/preview",
            post(handlers::attachment::preview),
        )
        .route(
            "/articles/{article_id}/attachments/tree",
            get(handlers::attachment::tree),
        )
        .route(
            "/articles/{article_id}/archive",
            get(handlers::archive::download_archive),
        )
        .route("/attachments/{id}", delete(handlers::attachment::delete))
}

/// Raw object access by bucket and key
fn storage_routes() -> Router<AppState> {
    Router::new().route(
        "/storage/{bucket}/objects/{*key}",
        get(handlers::storage::fetch_object),
    )
}

/// Health check
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
