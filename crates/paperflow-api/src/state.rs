//! Application state shared across handlers.

use paperflow_core::{Config, UploadValidator};
use paperflow_db::{DocumentStore, InvoiceStore};
use paperflow_engine::{EngineApi, NotificationRelay};
use paperflow_storage::Storage;
use paperflow_worker::{ExecutionMonitor, ProgressRegistry};
use sqlx::PgPool;
use std::sync::Arc;

/// Everything a handler can reach. Cloned via Arc into each request.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub documents: Arc<dyn DocumentStore>,
    pub invoices: Arc<dyn InvoiceStore>,
    pub storage: Arc<dyn Storage>,
    pub engine: Arc<dyn EngineApi>,
    pub registry: ProgressRegistry,
    pub relay: NotificationRelay,
    pub monitor: ExecutionMonitor,
    pub validator: UploadValidator,
    pub is_production: bool,
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
