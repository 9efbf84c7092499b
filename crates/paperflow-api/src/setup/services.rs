//! Service and repository wiring

use crate::state::AppState;
use anyhow::Result;
use paperflow_core::constants::TYPICAL_EXECUTION_SECS;
use paperflow_core::{Config, UploadValidator};
use paperflow_db::{DocumentRepository, InvoiceRepository};
use paperflow_engine::{
    EngineApi, HttpEngineClient, HttpNotifySink, NotificationRelay, NotifySink,
};
use paperflow_storage::Storage;
use paperflow_worker::{ExecutionMonitor, MonitorConfig, ProgressRegistry};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Build the shared application state from the connected pool and storage.
pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let engine: Arc<dyn EngineApi> = Arc::new(HttpEngineClient::new(
        config.engine_webhook_url.clone(),
        config.engine_api_url.clone(),
        config.engine_api_key.clone(),
        config.engine_request_timeout_secs,
    )?);

    let relay = match &config.notify_url {
        Some(url) => {
            let sink: Arc<dyn NotifySink> = Arc::new(HttpNotifySink::new(
                url.clone(),
                config.engine_request_timeout_secs,
            )?);
            tracing::info!("Notification relay enabled");
            NotificationRelay::new(Some(sink))
        }
        None => NotificationRelay::disabled(),
    };

    let registry = ProgressRegistry::new();
    let monitor = ExecutionMonitor::new(
        engine.clone(),
        registry.clone(),
        relay.clone(),
        MonitorConfig {
            poll_interval: Duration::from_millis(config.monitor_poll_interval_ms),
            typical_duration_secs: TYPICAL_EXECUTION_SECS,
            timeout: Duration::from_secs(config.monitor_timeout_secs),
            notify_step_secs: config.notify_step_secs,
        },
    );

    Ok(Arc::new(AppState {
        documents: Arc::new(DocumentRepository::new(pool.clone())),
        invoices: Arc::new(InvoiceRepository::new(pool.clone())),
        pool,
        storage,
        engine,
        registry,
        relay,
        monitor,
        validator: UploadValidator::new(config.max_file_size_bytes),
        is_production: config.is_production(),
        config: config.clone(),
    }))
}
