//! Application builder: wires router, middleware, and state into an Axum app.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use attach_core::config::{AppConfig, DatabaseBackend};
use attach_core::error::AppError;
use attach_database::store::FileRecordStore;
use attach_database::{DatabasePool, InMemoryFileRecordStore};
use attach_storage::StorageManager;

use crate::middleware::compression::build_compression_layer;
use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);
    build_router(state)
        .layer(build_compression_layer())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Runs the attachment server with the given configuration.
pub async fn run_server(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting attachment server...");

    // ── Step 1: Initialize storage providers ─────────────────────
    let storage_manager = Arc::new(StorageManager::from_config(&config.storage).await?);

    // ── Step 2: Initialize metadata store ────────────────────────
    let (store, db_pool): (Arc<dyn FileRecordStore>, Option<DatabasePool>) =
        match config.database.backend {
            DatabaseBackend::Postgres => {
                let pool = DatabasePool::connect(&config.database).await?;
                (Arc::new(pool.file_records()), Some(pool))
            }
            DatabaseBackend::Memory => {
                tracing::warn!("Using the in-memory metadata store; records are lost on exit");
                (Arc::new(InMemoryFileRecordStore::new()), None)
            }
        };

    // ── Step 3: Build and start HTTP server ──────────────────────
    let request_timeout = Duration::from_secs(config.server.request_timeout_seconds);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app_state = AppState::new(config, store, storage_manager);
    let app = build_app(app_state).layer(TimeoutLayer::new(request_timeout));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Attachment server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 4: Release resources ────────────────────────────────
    if let Some(pool) = db_pool {
        pool.close().await;
    }
    tracing::info!("Attachment server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
