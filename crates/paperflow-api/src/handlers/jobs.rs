//! Upload job progress endpoints over the in-memory registry.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use paperflow_core::models::UploadJob;
use paperflow_core::AppError;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct JobResponse {
    pub id: String,
    pub filename: String,
    pub status: String,
    pub progress_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_remaining_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_note: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UploadJob> for JobResponse {
    fn from(job: UploadJob) -> Self {
        Self {
            id: job.id,
            filename: job.filename,
            status: job.status.to_string(),
            progress_percent: job.progress_percent,
            estimated_remaining_seconds: job.estimated_remaining_seconds,
            execution_id: job.execution_id,
            error_message: job.error_message,
            failure_cause: job.failure_cause.map(|c| c.to_string()),
            status_note: job.status_note,
            started_at: job.started_at,
            updated_at: job.updated_at,
        }
    }
}

/// Snapshot of all jobs in flight, newest first.
#[utoipa::path(
    get,
    path = "/api/v0/jobs",
    tag = "jobs",
    responses(
        (status = 200, description = "All registered jobs")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let jobs: Vec<JobResponse> = state
        .registry
        .list()
        .await
        .into_iter()
        .map(JobResponse::from)
        .collect();

    Ok(Json(serde_json::json!({
        "jobs": jobs,
        "count": jobs.len()
    })))
}

/// Get one job by id.
#[utoipa::path(
    get,
    path = "/api/v0/jobs/{id}",
    tag = "jobs",
    params(("id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job state", body = JobResponse),
        (status = 404, description = "Unknown job", body = crate::error::ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, HttpAppError> {
    match state.registry.get(&id).await {
        Some(job) => Ok(Json(JobResponse::from(job))),
        None => Err(AppError::NotFound("Job not found".to_string()).into()),
    }
}

/// Cancel a job's monitor and drop it from the registry.
///
/// The job gets no terminal transition; it simply stops being tracked.
#[utoipa::path(
    delete,
    path = "/api/v0/jobs/{id}",
    tag = "jobs",
    params(("id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job cancelled and removed"),
        (status = 404, description = "Unknown job", body = crate::error::ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    match state.registry.remove(&id).await {
        Some(job) => {
            tracing::info!(job_id = %id, status = %job.status, "Job cancelled and removed");
            Ok(Json(serde_json::json!({
                "id": id,
                "cancelled": true
            })))
        }
        None => Err(AppError::NotFound("Job not found".to_string()).into()),
    }
}
