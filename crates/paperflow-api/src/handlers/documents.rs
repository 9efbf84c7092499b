//! Document ingestion and listing.

use crate::constants::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::error::HttpAppError;
use crate::services::ingest::{ingest_file, FileUploadResult, IncomingFile};
use crate::state::AppState;
use axum::{
    extract::{Multipart, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use paperflow_core::AppError;
use paperflow_db::DocumentStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadBatchResponse {
    pub message: String,
    pub results: Vec<FileUploadResult>,
    pub total_files: usize,
    pub success_count: usize,
}

/// Upload a batch of invoice documents.
///
/// Multipart form: one or more file parts plus optional text fields
/// `notify_to` (message address for progress updates), `uploader_id` and
/// `uploader_username`. Files are processed independently; the response
/// reports each one.
#[utoipa::path(
    post,
    path = "/api/v0/documents",
    tag = "documents",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Per-file results", body = UploadBatchResponse),
        (status = 400, description = "Malformed multipart body", body = crate::error::ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_documents(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadBatchResponse>, HttpAppError> {
    let mut files: Vec<IncomingFile> = Vec::new();
    let mut notify_address: Option<String> = None;
    let mut uploader_id: Option<Uuid> = None;
    let mut uploader_username: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if field.file_name().is_some() {
            let filename = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read file part: {}", e)))?
                .to_vec();
            files.push(IncomingFile {
                filename,
                content_type,
                data,
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read form field: {}", e)))?;
        match name.as_str() {
            "notify_to" => notify_address = Some(value),
            "uploader_id" => {
                uploader_id = Some(
                    value
                        .parse::<Uuid>()
                        .map_err(|_| AppError::BadRequest("uploader_id must be a UUID".into()))?,
                )
            }
            "uploader_username" => uploader_username = Some(value),
            _ => {
                tracing::debug!(field = %name, "Ignoring unknown form field");
            }
        }
    }

    if files.is_empty() {
        return Err(AppError::BadRequest("No files provided".to_string()).into());
    }

    let total_files = files.len();
    let mut results = Vec::with_capacity(total_files);
    for file in files {
        results.push(
            ingest_file(
                &state,
                file,
                notify_address.clone(),
                uploader_id,
                uploader_username.clone(),
            )
            .await,
        );
    }

    let success_count = results.iter().filter(|r| r.success).count();
    tracing::info!(total_files, success_count, "Upload batch processed");

    Ok(Json(UploadBatchResponse {
        message: format!(
            "Processed {} file(s), {} succeeded",
            total_files, success_count
        ),
        results,
        total_files,
        success_count,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListDocumentsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub filename: String,
    pub original_filename: String,
    pub storage_url: String,
    pub content_type: String,
    pub size_bytes: i64,
    /// Uploader display name; falls back to the original filename when the
    /// uploader is unknown.
    pub uploader: String,
    pub created_at: DateTime<Utc>,
}

/// List stored documents, newest first.
#[utoipa::path(
    get,
    path = "/api/v0/documents",
    tag = "documents",
    params(
        ("limit" = Option<i64>, Query, description = "Page size, capped at 200"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    responses(
        (status = 200, description = "Documents, newest first")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);

    let documents = state.documents.list(limit, offset).await?;

    let responses: Vec<DocumentResponse> = documents
        .into_iter()
        .map(|doc| DocumentResponse {
            uploader: doc.display_uploader().to_string(),
            id: doc.id,
            filename: doc.filename,
            original_filename: doc.original_filename,
            storage_url: doc.storage_url,
            content_type: doc.content_type,
            size_bytes: doc.size_bytes,
            created_at: doc.created_at,
        })
        .collect();

    Ok(Json(serde_json::json!({
        "documents": responses,
        "count": responses.len()
    })))
}
