//! Document repository: rows for stored uploads.

use async_trait::async_trait;
use paperflow_core::models::{DocumentRecord, NewDocument};
use paperflow_core::AppError;
use sqlx::{PgPool, Postgres};

const DOCUMENT_COLUMNS: &str = "id, storage_key, storage_url, filename, original_filename, \
     content_type, size_bytes, uploader_id, uploader_username, created_at";

/// Persistence seam for documents. The Postgres repository is the real
/// implementation; services depend on the trait so they can run against
/// in-memory stores in tests.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document row and return it.
    async fn create(&self, document: NewDocument) -> Result<DocumentRecord, AppError>;

    /// List documents, newest first.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<DocumentRecord>, AppError>;
}

/// Repository for the documents table.
#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for DocumentRepository {
    #[tracing::instrument(skip(self, document), fields(db.table = "documents", filename = %document.filename))]
    async fn create(&self, document: NewDocument) -> Result<DocumentRecord, AppError> {
        let row = sqlx::query_as::<Postgres, DocumentRecord>(
            r#"
            INSERT INTO documents (
                storage_key, storage_url, filename, original_filename,
                content_type, size_bytes, uploader_id, uploader_username
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, storage_key, storage_url, filename, original_filename,
                      content_type, size_bytes, uploader_id, uploader_username, created_at
            "#,
        )
        .bind(&document.storage_key)
        .bind(&document.storage_url)
        .bind(&document.filename)
        .bind(&document.original_filename)
        .bind(&document.content_type)
        .bind(document.size_bytes)
        .bind(document.uploader_id)
        .bind(&document.uploader_username)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents"))]
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<DocumentRecord>, AppError> {
        let rows = sqlx::query_as::<Postgres, DocumentRecord>(&format!(
            "SELECT {} FROM documents ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            DOCUMENT_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
