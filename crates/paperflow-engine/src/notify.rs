//! Notification relay
//!
//! Fire-and-forget progress messages for jobs that carry a notify address
//! (e.g. a messaging gateway sender). Delivery failure never affects job
//! state; it is logged and dropped.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::client::EngineError;

/// Seam for the outbound message channel.
#[async_trait]
pub trait NotifySink: Send + Sync {
    async fn send(&self, address: &str, message: &str) -> Result<(), EngineError>;
}

/// Sink that POSTs `{to, message}` to a configured gateway URL.
#[derive(Clone)]
pub struct HttpNotifySink {
    http_client: Client,
    url: String,
}

impl HttpNotifySink {
    pub fn new(url: String, timeout_secs: u64) -> Result<Self, anyhow::Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { http_client, url })
    }
}

#[async_trait]
impl NotifySink for HttpNotifySink {
    async fn send(&self, address: &str, message: &str) -> Result<(), EngineError> {
        let response = self
            .http_client
            .post(&self.url)
            .json(&json!({"to": address, "message": message}))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::UnexpectedStatus(status.as_u16()));
        }
        Ok(())
    }
}

/// Emits "still processing" messages when elapsed time crosses the next
/// threshold. Crossing-based rather than modulo, so a slow poll cannot skip
/// an update and a fast poll cannot duplicate one.
#[derive(Debug, Clone)]
pub struct ThresholdStepper {
    step_secs: u64,
    next_threshold_secs: u64,
}

impl ThresholdStepper {
    pub fn new(step_secs: u64) -> Self {
        let step_secs = step_secs.max(1);
        Self {
            step_secs,
            next_threshold_secs: step_secs,
        }
    }

    /// True once per crossed threshold; advances past the elapsed time so a
    /// long gap yields a single message.
    pub fn crossed(&mut self, elapsed_secs: u64) -> bool {
        if elapsed_secs < self.next_threshold_secs {
            return false;
        }
        while self.next_threshold_secs <= elapsed_secs {
            self.next_threshold_secs += self.step_secs;
        }
        true
    }
}

/// Sends lifecycle messages for a job when it has a notify address.
#[derive(Clone)]
pub struct NotificationRelay {
    sink: Option<Arc<dyn NotifySink>>,
}

impl NotificationRelay {
    pub fn new(sink: Option<Arc<dyn NotifySink>>) -> Self {
        Self { sink }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    async fn send(&self, address: &str, message: String) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        if let Err(e) = sink.send(address, &message).await {
            tracing::warn!(error = %e, address = %address, "Notification delivery failed");
        }
    }

    pub async fn notify_started(&self, address: &str, filename: &str) {
        self.send(
            address,
            format!(
                "Processing your invoice: {}. This may take 1-2 minutes.",
                filename
            ),
        )
        .await;
    }

    pub async fn notify_still_processing(&self, address: &str, filename: &str, elapsed_secs: u64) {
        self.send(
            address,
            format!(
                "Still processing {} ({}s elapsed). Please wait.",
                filename, elapsed_secs
            ),
        )
        .await;
    }

    pub async fn notify_completed(&self, address: &str, filename: &str) {
        self.send(
            address,
            format!(
                "Invoice processing completed: {}. The extracted data has been saved.",
                filename
            ),
        )
        .await;
    }

    pub async fn notify_failed(&self, address: &str, filename: &str, error: &str) {
        self.send(
            address,
            format!("Invoice processing failed: {} ({})", filename, error),
        )
        .await;
    }
}
