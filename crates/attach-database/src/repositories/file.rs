//! File record repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use attach_core::error::{AppError, ErrorKind};
use attach_core::result::AppResult;
use attach_entity::file::{CreateFileRecord, FileRecord};

use crate::store::FileRecordStore;

/// PostgreSQL error code for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Repository for attachment file records.
#[derive(Debug, Clone)]
pub struct FileRecordRepository {
    pool: PgPool,
}

impl FileRecordRepository {
    /// Create a new file record repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileRecordStore for FileRecordRepository {
    async fn create(&self, data: CreateFileRecord) -> AppResult<FileRecord> {
        sqlx::query_as::<_, FileRecord>(
            "INSERT INTO attachment_files \
             (id, article_id, original_name, virtual_path, bucket, storage_key, size_bytes, content_type) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.article_id)
        .bind(&data.original_name)
        .bind(&data.virtual_path)
        .bind(&data.bucket)
        .bind(&data.storage_key)
        .bind(data.size_bytes)
        .bind(&data.content_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .and_then(|db| db.code())
                .is_some_and(|code| code == UNIQUE_VIOLATION);
            if duplicate {
                AppError::with_source(
                    ErrorKind::Conflict,
                    format!(
                        "Storage key already recorded: {}/{}",
                        data.bucket, data.storage_key
                    ),
                    e,
                )
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to create file record", e)
            }
        })
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>("SELECT * FROM attachment_files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file record", e))
    }

    async fn find_by_storage_key(
        &self,
        bucket: &str,
        key: &str,
    ) -> AppResult<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM attachment_files WHERE bucket = $1 AND storage_key = $2",
        )
        .bind(bucket)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find file record by key", e)
        })
    }

    async fn list_by_article(&self, article_id: Uuid) -> AppResult<Vec<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM attachment_files WHERE article_id = $1 \
             ORDER BY virtual_path ASC, created_at ASC, original_name ASC",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list file records", e))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM attachment_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete file record", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }
}
