//! Remote execution state and progress estimation.
//!
//! The engine's execution API speaks a loose vocabulary; this module
//! canonicalizes it to `{running, success, error}` and derives a progress
//! percentage for executions that report none.

use chrono::{DateTime, Utc};
use paperflow_core::constants::{PROGRESS_CEILING, PROGRESS_FLOOR};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Success,
    Error,
}

impl ExecutionStatus {
    /// Map the engine's status string onto the canonical vocabulary.
    /// Unknown strings count as still running.
    pub fn canonicalize(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "success" => ExecutionStatus::Success,
            "error" | "failed" | "crashed" => ExecutionStatus::Error,
            _ => ExecutionStatus::Running,
        }
    }
}

/// Normalized view of one engine execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteExecution {
    pub id: String,
    pub status: ExecutionStatus,
    pub finished: bool,
    pub success: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl RemoteExecution {
    /// Measured wall-clock duration of the execution, when both ends are known.
    pub fn measured_duration_secs(&self) -> Option<f64> {
        match (self.started_at, self.stopped_at) {
            (Some(start), Some(stop)) if stop >= start => {
                Some((stop - start).num_milliseconds() as f64 / 1000.0)
            }
            _ => None,
        }
    }
}

/// Build a normalized execution from the engine's raw JSON body.
///
/// The engine sometimes reports `finished: false` with a terminal status
/// string, so the finished flag is ORed with status finality.
pub fn parse_execution(body: &Value) -> RemoteExecution {
    let id = json_id(body.get("id")).unwrap_or_default();
    let raw_status = body.get("status").and_then(Value::as_str).unwrap_or("");
    let status = ExecutionStatus::canonicalize(raw_status);
    let finished_flag = body.get("finished").and_then(Value::as_bool).unwrap_or(false);
    let finished = finished_flag || status != ExecutionStatus::Running;

    let error = if status == ExecutionStatus::Error {
        Some(
            body.pointer("/data/resultData/error/message")
                .and_then(Value::as_str)
                .unwrap_or("Execution failed")
                .to_string(),
        )
    } else {
        None
    };

    RemoteExecution {
        id,
        status,
        finished,
        success: status == ExecutionStatus::Success,
        started_at: parse_timestamp(body.get("startedAt")),
        stopped_at: parse_timestamp(body.get("stoppedAt")),
        error,
    }
}

/// Execution ids arrive as strings or numbers depending on the engine version.
pub(crate) fn json_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Estimate progress while the engine reports none: a linear ramp from the
/// floor to the ceiling over the typical execution duration. 95-100 stays
/// reserved for confirmed completion.
pub fn estimate_progress(elapsed_secs: f64, typical_duration_secs: u64) -> u8 {
    let typical = typical_duration_secs.max(1) as f64;
    let span = (PROGRESS_CEILING - PROGRESS_FLOOR) as f64;
    let raw = PROGRESS_FLOOR as f64 + (elapsed_secs / typical) * span;
    (raw.floor() as i64).clamp(PROGRESS_FLOOR as i64, PROGRESS_CEILING as i64) as u8
}

/// Remaining-time estimate paired with the progress ramp. Saturates at zero
/// once the typical duration has elapsed.
pub fn estimate_remaining_seconds(elapsed_secs: f64, typical_duration_secs: u64) -> u64 {
    let typical = typical_duration_secs as f64;
    if elapsed_secs >= typical {
        0
    } else {
        (typical - elapsed_secs).ceil() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonicalize_status() {
        assert_eq!(
            ExecutionStatus::canonicalize("success"),
            ExecutionStatus::Success
        );
        assert_eq!(
            ExecutionStatus::canonicalize("error"),
            ExecutionStatus::Error
        );
        assert_eq!(
            ExecutionStatus::canonicalize("failed"),
            ExecutionStatus::Error
        );
        assert_eq!(
            ExecutionStatus::canonicalize("crashed"),
            ExecutionStatus::Error
        );
        assert_eq!(
            ExecutionStatus::canonicalize("running"),
            ExecutionStatus::Running
        );
        assert_eq!(
            ExecutionStatus::canonicalize("waiting"),
            ExecutionStatus::Running
        );
    }

    #[test]
    fn test_parse_execution_success() {
        let body = json!({
            "id": "4217",
            "status": "success",
            "finished": true,
            "startedAt": "2024-03-01T10:00:00.000Z",
            "stoppedAt": "2024-03-01T10:01:20.000Z"
        });
        let exec = parse_execution(&body);
        assert_eq!(exec.id, "4217");
        assert_eq!(exec.status, ExecutionStatus::Success);
        assert!(exec.finished);
        assert!(exec.success);
        assert_eq!(exec.measured_duration_secs(), Some(80.0));
        assert!(exec.error.is_none());
    }

    #[test]
    fn test_parse_execution_terminal_status_overrides_finished_flag() {
        let body = json!({"id": "1", "status": "success", "finished": false});
        let exec = parse_execution(&body);
        assert!(exec.finished);
        assert!(exec.success);
    }

    #[test]
    fn test_parse_execution_error_extracts_message() {
        let body = json!({
            "id": "2",
            "status": "error",
            "finished": true,
            "data": {"resultData": {"error": {"message": "node timed out"}}}
        });
        let exec = parse_execution(&body);
        assert_eq!(exec.status, ExecutionStatus::Error);
        assert!(!exec.success);
        assert_eq!(exec.error.as_deref(), Some("node timed out"));
    }

    #[test]
    fn test_parse_execution_error_without_detail_gets_default() {
        let body = json!({"id": "3", "status": "error"});
        let exec = parse_execution(&body);
        assert_eq!(exec.error.as_deref(), Some("Execution failed"));
    }

    #[test]
    fn test_parse_execution_numeric_id() {
        let body = json!({"id": 4217, "status": "running"});
        let exec = parse_execution(&body);
        assert_eq!(exec.id, "4217");
        assert!(!exec.finished);
    }

    #[test]
    fn test_estimate_progress_ramp() {
        assert_eq!(estimate_progress(0.0, 80), 25);
        assert_eq!(estimate_progress(40.0, 80), 60);
        assert_eq!(estimate_progress(80.0, 80), 95);
        // Floor and ceiling clamp
        assert_eq!(estimate_progress(-5.0, 80), 25);
        assert_eq!(estimate_progress(500.0, 80), 95);
    }

    #[test]
    fn test_estimate_remaining_seconds() {
        assert_eq!(estimate_remaining_seconds(0.0, 80), 80);
        assert_eq!(estimate_remaining_seconds(30.0, 80), 50);
        assert_eq!(estimate_remaining_seconds(80.0, 80), 0);
        assert_eq!(estimate_remaining_seconds(200.0, 80), 0);
    }
}
