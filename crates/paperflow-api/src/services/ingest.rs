//! Per-file ingestion pipeline.
//!
//! One file moves through validate -> seed job -> store -> record ->
//! dispatch -> monitor. Each stage failure is captured in the returned
//! result; sibling files of a batch are never affected. The document row
//! outlives dispatch failure on purpose: the bytes are safe, only the
//! automation leg failed.

use crate::state::AppState;
use chrono::Utc;
use paperflow_core::models::{FailureCause, JobStatus, NewDocument, UploadJob};
use paperflow_db::DocumentStore;
use paperflow_engine::DispatchRequest;
use paperflow_storage::{storage_key, stored_filename_now};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// One file part of a multipart batch.
#[derive(Debug)]
pub struct IncomingFile {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Per-file outcome reported back to the uploader.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileUploadResult {
    pub filename: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileUploadResult {
    fn rejected(filename: String, error: String) -> Self {
        Self {
            filename,
            success: false,
            storage_url: None,
            document_id: None,
            job_id: None,
            execution_id: None,
            error: Some(error),
        }
    }
}

/// Run one file through the whole pipeline. Never returns Err: every
/// failure mode is folded into the result so the batch can keep going.
#[tracing::instrument(skip(state, file), fields(filename = %file.filename, size_bytes = file.data.len()))]
pub async fn ingest_file(
    state: &AppState,
    file: IncomingFile,
    notify_address: Option<String>,
    uploader_id: Option<Uuid>,
    uploader_username: Option<String>,
) -> FileUploadResult {
    if let Err(e) = state
        .validator
        .validate(&file.filename, &file.content_type, file.data.len())
    {
        tracing::debug!(error = %e, "File rejected by validation");
        return FileUploadResult::rejected(file.filename, e.to_string());
    }

    // The job exists from the moment the file is accepted, so progress is
    // observable through the registry while the bytes are still in flight.
    let job_id = Uuid::new_v4().to_string();
    let mut job = UploadJob::new(
        job_id.clone(),
        file.filename.clone(),
        file.content_type.clone(),
        file.data.len() as i64,
    );
    job.notify_address = notify_address.clone();
    state.registry.upsert(job).await;
    state
        .registry
        .update(&job_id, |job| {
            job.advance(JobStatus::Uploading);
        })
        .await;

    let stored = stored_filename_now(&file.filename);
    let key = storage_key(&stored);
    let size_bytes = file.data.len() as i64;

    let storage_url = match state
        .storage
        .upload(&key, &file.content_type, file.data)
        .await
    {
        Ok(url) => url,
        Err(e) => {
            let message = e.to_string();
            tracing::error!(error = %message, storage_key = %key, "Storage write failed");
            fail_job(state, &job_id, &message, notify_address.as_deref(), &file.filename).await;
            return FileUploadResult {
                filename: file.filename,
                success: false,
                storage_url: None,
                document_id: None,
                job_id: Some(job_id),
                execution_id: None,
                error: Some(message),
            };
        }
    };

    let record = match state
        .documents
        .create(NewDocument {
            storage_key: key.clone(),
            storage_url: storage_url.clone(),
            filename: stored.clone(),
            original_filename: file.filename.clone(),
            content_type: file.content_type.clone(),
            size_bytes,
            uploader_id,
            uploader_username,
        })
        .await
    {
        Ok(record) => record,
        Err(e) => {
            let message = e.to_string();
            tracing::error!(error = %message, storage_key = %key, "Document insert failed");
            // The row is the source of truth; without it the stored bytes
            // are orphans, so clean them up best-effort.
            if let Err(delete_err) = state.storage.delete(&key).await {
                tracing::warn!(error = %delete_err, storage_key = %key, "Orphan cleanup failed");
            }
            fail_job(state, &job_id, &message, notify_address.as_deref(), &file.filename).await;
            return FileUploadResult {
                filename: file.filename,
                success: false,
                storage_url: None,
                document_id: None,
                job_id: Some(job_id),
                execution_id: None,
                error: Some(message),
            };
        }
    };

    let request = DispatchRequest {
        document_id: record.id,
        storage_url: storage_url.clone(),
        original_filename: file.filename.clone(),
        stored_filename: stored,
        content_type: file.content_type,
        uploader_id,
        timestamp: Utc::now(),
    };

    let outcome = match state.engine.dispatch(&request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            let message = e.to_string();
            tracing::warn!(error = %message, document_id = %record.id, "Dispatch failed");
            state
                .registry
                .update(&job_id, |job| {
                    job.mark_failed(FailureCause::DispatchError, &message);
                })
                .await;
            if let Some(address) = notify_address.as_deref() {
                state
                    .relay
                    .notify_failed(address, &file.filename, &message)
                    .await;
            }
            return FileUploadResult {
                filename: file.filename,
                success: false,
                storage_url: Some(storage_url),
                document_id: Some(record.id),
                job_id: Some(job_id),
                execution_id: None,
                error: Some(message),
            };
        }
    };

    state
        .registry
        .update(&job_id, |job| {
            job.advance(JobStatus::Dispatched);
        })
        .await;

    match outcome.execution_id {
        Some(execution_id) => {
            let _handle = state
                .monitor
                .spawn(job_id.clone(), execution_id.clone())
                .await;
            FileUploadResult {
                filename: file.filename,
                success: true,
                storage_url: Some(storage_url),
                document_id: Some(record.id),
                job_id: Some(job_id),
                execution_id: Some(execution_id),
                error: None,
            }
        }
        None => {
            // Accepted but unpollable: finalize instead of spinning forever.
            let mut transitioned = false;
            state
                .registry
                .update(&job_id, |job| {
                    job.status_note = Some("submitted; remote status unknown".to_string());
                    transitioned = job.mark_completed();
                })
                .await;
            if transitioned {
                if let Some(address) = notify_address.as_deref() {
                    state.relay.notify_completed(address, &file.filename).await;
                }
            }
            tracing::info!(
                document_id = %record.id,
                "Dispatch accepted without an execution handle"
            );
            FileUploadResult {
                filename: file.filename,
                success: true,
                storage_url: Some(storage_url),
                document_id: Some(record.id),
                job_id: Some(job_id),
                execution_id: None,
                error: None,
            }
        }
    }
}

async fn fail_job(
    state: &AppState,
    job_id: &str,
    message: &str,
    notify_address: Option<&str>,
    filename: &str,
) {
    let mut transitioned = false;
    state
        .registry
        .update(job_id, |job| {
            transitioned = job.mark_failed(FailureCause::StorageError, message);
        })
        .await;
    if transitioned {
        if let Some(address) = notify_address {
            state.relay.notify_failed(address, filename, message).await;
        }
    }
}
