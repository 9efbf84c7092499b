use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable record of a stored upload. Written the moment the bytes land in
/// storage and the row inserts; it outlives any dispatch or polling failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub storage_key: String,
    pub storage_url: String,
    /// Stored name, timestamp-prefixed and whitespace-normalized.
    pub filename: String,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploader_id: Option<Uuid>,
    pub uploader_username: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for DocumentRecord {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(DocumentRecord {
            id: row.get("id"),
            storage_key: row.get("storage_key"),
            storage_url: row.get("storage_url"),
            filename: row.get("filename"),
            original_filename: row.get("original_filename"),
            content_type: row.get("content_type"),
            size_bytes: row.get("size_bytes"),
            uploader_id: row.get("uploader_id"),
            uploader_username: row.get("uploader_username"),
            created_at: row.get("created_at"),
        })
    }
}

impl DocumentRecord {
    /// Display name for listings: uploader name when known, otherwise the
    /// original filename.
    pub fn display_uploader(&self) -> &str {
        self.uploader_username
            .as_deref()
            .unwrap_or(&self.original_filename)
    }
}

/// Insert payload for a new document row.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub storage_key: String,
    pub storage_url: String,
    pub filename: String,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploader_id: Option<Uuid>,
    pub uploader_username: Option<String>,
}
