//! Paperflow engine integration
//!
//! Client for the external automation engine: workflow dispatch, execution
//! status polling, and the outbound notification relay. Everything here is
//! plain HTTP; no engine state is stored locally.

pub mod client;
pub mod execution;
pub mod notify;

pub use client::{DispatchOutcome, DispatchRequest, EngineApi, EngineError, HttpEngineClient};
pub use execution::{
    estimate_progress, estimate_remaining_seconds, parse_execution, ExecutionStatus,
    RemoteExecution,
};
pub use notify::{HttpNotifySink, NotificationRelay, NotifySink, ThresholdStepper};
