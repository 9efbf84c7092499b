//! Engine execution status proxy.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use paperflow_engine::{ExecutionStatus, RemoteExecution};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ExecutionResponse {
    pub id: String,
    pub status: String,
    pub finished: bool,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<RemoteExecution> for ExecutionResponse {
    fn from(execution: RemoteExecution) -> Self {
        let status = match execution.status {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Error => "error",
        };
        Self {
            id: execution.id,
            status: status.to_string(),
            finished: execution.finished,
            success: execution.success,
            started_at: execution.started_at,
            stopped_at: execution.stopped_at,
            error: execution.error,
        }
    }
}

/// Fetch one engine execution, normalized to the canonical shape.
#[utoipa::path(
    get,
    path = "/api/v0/executions/{id}",
    tag = "executions",
    params(("id" = String, Path, description = "Engine execution id")),
    responses(
        (status = 200, description = "Normalized execution state", body = ExecutionResponse),
        (status = 404, description = "Unknown execution", body = crate::error::ErrorResponse),
        (status = 502, description = "Engine unreachable", body = crate::error::ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_execution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ExecutionResponse>, HttpAppError> {
    let execution = state.engine.fetch_execution(&id).await?;
    Ok(Json(ExecutionResponse::from(execution)))
}
