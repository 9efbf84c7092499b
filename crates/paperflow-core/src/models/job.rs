use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Lifecycle of an upload job. Transitions are strictly forward;
/// `rank` defines the ordering and `advance` enforces it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Uploading,
    Dispatched,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Uploading => 1,
            JobStatus::Dispatched => 2,
            JobStatus::Processing => 3,
            JobStatus::Completed => 4,
            JobStatus::Failed => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Uploading => write!(f, "uploading"),
            JobStatus::Dispatched => write!(f, "dispatched"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "uploading" => Ok(JobStatus::Uploading),
            "dispatched" => Ok(JobStatus::Dispatched),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Why a job ended up Failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    StorageError,
    DispatchError,
    RemoteError,
    TrackingLost,
    Timeout,
}

impl Display for FailureCause {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FailureCause::StorageError => write!(f, "storage_error"),
            FailureCause::DispatchError => write!(f, "dispatch_error"),
            FailureCause::RemoteError => write!(f, "remote_error"),
            FailureCause::TrackingLost => write!(f, "tracking_lost"),
            FailureCause::Timeout => write!(f, "timeout"),
        }
    }
}

impl FromStr for FailureCause {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "storage_error" => Ok(FailureCause::StorageError),
            "dispatch_error" => Ok(FailureCause::DispatchError),
            "remote_error" => Ok(FailureCause::RemoteError),
            "tracking_lost" => Ok(FailureCause::TrackingLost),
            "timeout" => Ok(FailureCause::Timeout),
            _ => Err(anyhow::anyhow!("Invalid failure cause: {}", s)),
        }
    }
}

/// In-memory record of one file moving through the pipeline.
/// Owned by the progress registry; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadJob {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub status: JobStatus,
    pub execution_id: Option<String>,
    pub progress_percent: u8,
    pub estimated_remaining_seconds: Option<u64>,
    pub error_message: Option<String>,
    pub failure_cause: Option<FailureCause>,
    pub notify_address: Option<String>,
    /// Free-form annotation for unusual terminal states, e.g. a dispatch
    /// that was accepted but returned no execution handle.
    pub status_note: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadJob {
    pub fn new(id: String, filename: String, content_type: String, size_bytes: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            filename,
            content_type,
            size_bytes,
            status: JobStatus::Queued,
            execution_id: None,
            progress_percent: 0,
            estimated_remaining_seconds: None,
            error_message: None,
            failure_cause: None,
            notify_address: None,
            status_note: None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Move to a later status. Requests that would move backwards or leave
    /// a terminal state are ignored, which keeps transitions monotonic
    /// under concurrent updates.
    pub fn advance(&mut self, status: JobStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if status.rank() < self.status.rank() {
            return false;
        }
        self.status = status;
        self.updated_at = Utc::now();
        true
    }

    /// Raise the progress percentage. Lower values are ignored so progress
    /// never runs backwards while a job is being polled.
    pub fn raise_progress(&mut self, percent: u8) {
        let percent = percent.min(100);
        if percent > self.progress_percent {
            self.progress_percent = percent;
            self.updated_at = Utc::now();
        }
    }

    pub fn mark_failed(&mut self, cause: FailureCause, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Failed;
        self.failure_cause = Some(cause);
        self.error_message = Some(message.into());
        self.updated_at = Utc::now();
        true
    }

    pub fn mark_completed(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Completed;
        self.progress_percent = 100;
        self.estimated_remaining_seconds = Some(0);
        self.updated_at = Utc::now();
        true
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> UploadJob {
        UploadJob::new(
            "job-1".to_string(),
            "invoice.pdf".to_string(),
            "application/pdf".to_string(),
            1024,
        )
    }

    #[test]
    fn test_job_status_display() {
        assert_eq!(JobStatus::Queued.to_string(), "queued");
        assert_eq!(JobStatus::Uploading.to_string(), "uploading");
        assert_eq!(JobStatus::Dispatched.to_string(), "dispatched");
        assert_eq!(JobStatus::Processing.to_string(), "processing");
        assert_eq!(JobStatus::Completed.to_string(), "completed");
        assert_eq!(JobStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_job_status_from_str() {
        assert_eq!("queued".parse::<JobStatus>().unwrap(), JobStatus::Queued);
        assert_eq!(
            "processing".parse::<JobStatus>().unwrap(),
            JobStatus::Processing
        );
        assert!("cancelled".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_failure_cause_roundtrip() {
        assert_eq!(FailureCause::DispatchError.to_string(), "dispatch_error");
        assert_eq!(FailureCause::StorageError.to_string(), "storage_error");
        assert_eq!(
            "tracking_lost".parse::<FailureCause>().unwrap(),
            FailureCause::TrackingLost
        );
        assert!("oom".parse::<FailureCause>().is_err());
    }

    #[test]
    fn test_new_job_starts_queued_at_zero() {
        let job = job();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress_percent, 0);
        assert!(job.execution_id.is_none());
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut job = job();
        assert!(job.advance(JobStatus::Uploading));
        assert!(job.advance(JobStatus::Processing));
        assert!(!job.advance(JobStatus::Uploading));
        assert_eq!(job.status, JobStatus::Processing);
    }

    #[test]
    fn test_advance_rejected_after_terminal() {
        let mut job = job();
        assert!(job.mark_completed());
        assert!(!job.advance(JobStatus::Processing));
        assert!(!job.mark_failed(FailureCause::Timeout, "too late"));
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.failure_cause.is_none());
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut job = job();
        job.raise_progress(40);
        job.raise_progress(25);
        assert_eq!(job.progress_percent, 40);
        job.raise_progress(95);
        assert_eq!(job.progress_percent, 95);
    }

    #[test]
    fn test_progress_clamped_to_100() {
        let mut job = job();
        job.raise_progress(250);
        assert_eq!(job.progress_percent, 100);
    }

    #[test]
    fn test_mark_failed_sets_cause_and_message() {
        let mut job = job();
        assert!(job.mark_failed(FailureCause::RemoteError, "extraction crashed"));
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failure_cause, Some(FailureCause::RemoteError));
        assert_eq!(job.error_message.as_deref(), Some("extraction crashed"));
        assert!(job.is_terminal());
    }

    #[test]
    fn test_mark_completed_finishes_progress() {
        let mut job = job();
        job.raise_progress(60);
        assert!(job.mark_completed());
        assert_eq!(job.progress_percent, 100);
        assert_eq!(job.estimated_remaining_seconds, Some(0));
    }
}
