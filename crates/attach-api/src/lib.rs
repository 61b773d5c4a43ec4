//! # attach-api
//!
//! HTTP API layer for article attachments built on Axum.
//!
//! Provides the REST endpoints for ingesting, listing, fetching, and
//! archiving attachments, plus middleware (CORS, compression, logging),
//! extractors, DTOs, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use state::AppState;
