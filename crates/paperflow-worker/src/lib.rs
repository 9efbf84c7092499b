//! Paperflow worker
//!
//! In-memory progress registry and the per-job execution monitor task.

pub mod monitor;
pub mod registry;

pub use monitor::{ExecutionMonitor, MonitorConfig};
pub use registry::ProgressRegistry;
