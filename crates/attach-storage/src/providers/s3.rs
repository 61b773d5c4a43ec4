//! S3-compatible object storage provider (requires the `s3` feature).

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream as S3Body;
use bytes::Bytes;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use attach_core::config::S3StorageConfig;
use attach_core::error::{AppError, ErrorKind};
use attach_core::result::AppResult;
use attach_core::traits::storage::{ByteStream, StorageObjectMeta, StorageProvider};

use super::validate_key;

/// S3-compatible storage provider serving one bucket.
#[derive(Debug, Clone)]
pub struct S3StorageProvider {
    client: Client,
    bucket: String,
}

impl S3StorageProvider {
    /// Build a client for `bucket` from configuration.
    ///
    /// Empty credentials fall back to the default AWS credential chain.
    pub async fn new(config: &S3StorageConfig, bucket: &str) -> AppResult<Self> {
        info!(
            endpoint = %config.endpoint,
            region = %config.region,
            bucket,
            "Initializing S3 storage provider"
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if !config.access_key.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "attach-storage",
            ));
        }
        if !config.endpoint.is_empty() {
            loader = loader.endpoint_url(config.endpoint.trim_end_matches('/'));
        }

        let shared = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.force_path_style)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: bucket.to_string(),
        })
    }

    async fn get(&self, key: &str) -> AppResult<S3Body> {
        let key = validate_key(key)?;
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service = e.into_service_error();
                if service.is_no_such_key() {
                    AppError::with_source(
                        ErrorKind::NotFound,
                        format!("Object not found: {key}"),
                        service,
                    )
                } else {
                    AppError::with_source(ErrorKind::Storage, format!("get {key}"), service)
                }
            })?;
        Ok(response.body)
    }
}

#[async_trait]
impl StorageProvider for S3StorageProvider {
    fn provider_type(&self) -> &str {
        "s3"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok())
    }

    async fn read(&self, key: &str) -> AppResult<ByteStream> {
        let body = self.get(key).await?;
        Ok(Box::pin(ReaderStream::new(body.into_async_read())))
    }

    async fn write(&self, key: &str, data: Bytes) -> AppResult<()> {
        let key = validate_key(key)?;
        let size = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(S3Body::from(data))
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("put {key}"),
                    e.into_service_error(),
                )
            })?;
        debug!(key, bytes = size, "Wrote object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let key = validate_key(key)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("delete {key}"),
                    e.into_service_error(),
                )
            })?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<StorageObjectMeta>> {
        let prefix = prefix.trim_start_matches('/');
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("list {prefix}"),
                    e.into_service_error(),
                )
            })?;

            for object in response.contents() {
                let Some(key) = object.key() else { continue };
                objects.push(StorageObjectMeta {
                    key: key.to_string(),
                    size_bytes: object.size().unwrap_or(0).max(0) as u64,
                    last_modified: object
                        .last_modified()
                        .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
                });
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token().map(str::to_string);
            } else {
                break;
            }
        }

        Ok(objects)
    }
}
