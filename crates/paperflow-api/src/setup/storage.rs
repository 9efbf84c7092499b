//! Storage backend setup

use anyhow::{Context, Result};
use paperflow_core::Config;
use paperflow_storage::{create_storage, Storage};
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage backend")?;

    tracing::info!(backend = ?storage.backend_type(), "Storage ready");

    Ok(storage)
}
