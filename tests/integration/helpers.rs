//! Shared test helpers for integration tests.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;
use serde_json::Value;
use tower::ServiceExt;

use attach_api::{AppState, build_app};
use attach_core::config::{AppConfig, DatabaseBackend, StorageProviderKind};

/// Article id used throughout the tests. Its batch folder is `39dab4d8_f600`.
pub const ARTICLE: &str = "39dab4d8-f600-4c1e-9a51-0c7d2b1e8f00";

/// Batch container folder of [`ARTICLE`].
pub const ARTICLE_LABEL: &str = "39dab4d8_f600";

const BOUNDARY: &str = "attach-test-boundary";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state, for direct access to storage
    pub state: AppState,
}

impl TestApp {
    /// Create a test application on in-memory storage and metadata
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a test application with an adjusted configuration
    pub async fn with_config(config: AppConfig) -> Self {
        let state = AppState::in_memory(config).await;
        let router = build_app(state.clone());
        Self { router, state }
    }

    /// Make a JSON request to the test app
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        self.send(req).await
    }

    /// Send a multipart upload to an article's attachment endpoint
    pub async fn upload(&self, article: &str, form: Multipart) -> TestResponse {
        let req = Request::builder()
            .method("POST")
            .uri(format!("/api/articles/{article}/attachments"))
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(form.finish()))
            .expect("Failed to build request");

        self.send(req).await
    }

    /// Send a prepared request
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let raw = axum::body::to_bytes(response.into_body(), 64 * 1024 * 1024)
            .await
            .expect("Failed to read body");
        let body: Value = serde_json::from_slice(&raw).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            raw,
            body,
        }
    }
}

/// Configuration with memory backends and the default ingest policies
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.database.backend = DatabaseBackend::Memory;
    config.storage.provider = StorageProviderKind::Memory;
    config.storage.max_upload_size_bytes = 1024 * 1024;
    config
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub raw: Bytes,
    /// Parsed JSON body, `Null` when the body is not JSON
    pub body: Value,
}

impl TestResponse {
    /// A response header as text
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Minimal multipart/form-data body builder
#[derive(Debug, Default)]
pub struct Multipart {
    body: Vec<u8>,
}

impl Multipart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    /// Add a file picked on its own
    pub fn file(mut self, file_name: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Add a file from a directory selection
    pub fn file_at(self, relative_path: &str, data: &[u8]) -> Self {
        let name = relative_path.rsplit('/').next().unwrap_or(relative_path);
        self.text("relative_path", relative_path).file(name, data)
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

/// `data.created` of an ingest response as `(display path, id)` pairs, sorted
pub fn created_paths(body: &Value) -> Vec<(String, String)> {
    let mut created: Vec<(String, String)> = body["data"]["created"]
        .as_array()
        .expect("created array")
        .iter()
        .map(|record| {
            (
                format!(
                    "{}{}",
                    record["virtual_path"].as_str().unwrap_or_default(),
                    record["original_name"].as_str().unwrap_or_default()
                ),
                record["id"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    created.sort();
    created
}
