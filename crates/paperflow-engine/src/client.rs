//! HTTP client for the automation engine.
//!
//! Dispatch is a single POST to the intake webhook; execution status is a
//! GET against the engine's REST API with the API key header.

use crate::execution::{json_id, parse_execution, RemoteExecution};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

const API_KEY_HEADER: &str = "X-API-KEY";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Engine returned status {0}")]
    UnexpectedStatus(u16),

    #[error("Engine is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),
}

/// Payload posted to the engine's intake webhook for one stored document.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchRequest {
    pub document_id: Uuid,
    pub storage_url: String,
    pub original_filename: String,
    pub stored_filename: String,
    pub content_type: String,
    pub uploader_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

/// Result of a dispatch. A missing execution id is not an error; it only
/// means the run cannot be polled.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub execution_id: Option<String>,
}

/// Seam for the engine HTTP surface, mockable in monitor tests.
#[async_trait]
pub trait EngineApi: Send + Sync {
    /// Fire the intake webhook. Ok means the engine accepted the job (2xx).
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchOutcome, EngineError>;

    /// Fetch and normalize one execution.
    async fn fetch_execution(&self, execution_id: &str) -> Result<RemoteExecution, EngineError>;
}

/// reqwest-backed engine client.
#[derive(Clone)]
pub struct HttpEngineClient {
    http_client: Client,
    webhook_url: Option<String>,
    api_url: Option<String>,
    api_key: Option<String>,
}

impl HttpEngineClient {
    pub fn new(
        webhook_url: Option<String>,
        api_url: Option<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, anyhow::Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            http_client,
            webhook_url,
            api_url,
            api_key,
        })
    }

    fn api_request(&self, path: &str) -> Result<reqwest::RequestBuilder, EngineError> {
        let api_url = self
            .api_url
            .as_deref()
            .ok_or(EngineError::NotConfigured("ENGINE_API_URL"))?;
        let mut builder = self
            .http_client
            .get(format!("{}/{}", api_url.trim_end_matches('/'), path));
        if let Some(key) = self.api_key.as_deref() {
            builder = builder.header(API_KEY_HEADER, key);
        }
        Ok(builder)
    }

    /// The webhook body sometimes omits the execution id. Ask the engine for
    /// its most recent execution once, best-effort; any failure here leaves
    /// the id unknown rather than failing the dispatch.
    async fn latest_execution_id(&self) -> Option<String> {
        let builder = match self.api_request("executions?limit=1") {
            Ok(builder) => builder,
            Err(_) => return None,
        };

        let response = match builder.send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::warn!(
                    status = response.status().as_u16(),
                    "Latest-execution lookup rejected"
                );
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Latest-execution lookup failed");
                return None;
            }
        };

        let body: Value = response.json().await.ok()?;
        body.get("data")
            .and_then(Value::as_array)
            .and_then(|executions| executions.first())
            .and_then(|execution| json_id(execution.get("id")))
    }
}

#[async_trait]
impl EngineApi for HttpEngineClient {
    #[tracing::instrument(skip(self, request), fields(document_id = %request.document_id))]
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchOutcome, EngineError> {
        let webhook_url = self
            .webhook_url
            .as_deref()
            .ok_or(EngineError::NotConfigured("ENGINE_WEBHOOK_URL"))?;

        let response = self
            .http_client
            .post(webhook_url)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                body = %body,
                "Engine webhook rejected dispatch"
            );
            return Err(EngineError::UnexpectedStatus(status.as_u16()));
        }

        // Best-effort id extraction; webhook responses vary by engine setup.
        let execution_id = match response.json::<Value>().await {
            Ok(body) => json_id(body.get("executionId")).or_else(|| json_id(body.get("id"))),
            Err(_) => None,
        };

        let execution_id = match execution_id {
            Some(id) => Some(id),
            None => self.latest_execution_id().await,
        };

        tracing::info!(
            execution_id = execution_id.as_deref().unwrap_or("unknown"),
            "Workflow dispatched"
        );

        Ok(DispatchOutcome { execution_id })
    }

    #[tracing::instrument(skip(self), fields(execution_id = %execution_id))]
    async fn fetch_execution(&self, execution_id: &str) -> Result<RemoteExecution, EngineError> {
        let response = self
            .api_request(&format!("executions/{}", execution_id))?
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::UnexpectedStatus(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;

        let mut execution = parse_execution(&body);
        if execution.id.is_empty() {
            execution.id = execution_id.to_string();
        }
        Ok(execution)
    }
}
