//! Execution monitor
//!
//! One tokio task per dispatched job. Polls the engine immediately and then
//! at a fixed interval, estimates progress while the execution runs, and
//! drives the job to exactly one terminal state. The loop stops on: remote
//! completion, remote error, two consecutive poll failures, wall-clock
//! timeout, or cancellation (which leaves the job non-terminal for the
//! caller to dispose of).

use paperflow_core::constants::{PROGRESS_FLOOR, TYPICAL_EXECUTION_SECS};
use paperflow_core::models::{FailureCause, JobStatus};
use paperflow_engine::{
    estimate_progress, estimate_remaining_seconds, EngineApi, NotificationRelay, RemoteExecution,
    ThresholdStepper,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::registry::ProgressRegistry;

const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_NOTIFY_STEP_SECS: u64 = 30;
/// Upper bound on the completion replay; the wall-clock timeout must stay
/// the longest a job can be tracked, whatever duration the engine reports.
const MAX_REPLAY_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub typical_duration_secs: u64,
    /// Hard ceiling on how long a single execution is tracked.
    pub timeout: Duration,
    pub notify_step_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            typical_duration_secs: TYPICAL_EXECUTION_SECS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            notify_step_secs: DEFAULT_NOTIFY_STEP_SECS,
        }
    }
}

#[derive(Clone)]
pub struct ExecutionMonitor {
    engine: Arc<dyn EngineApi>,
    registry: ProgressRegistry,
    relay: NotificationRelay,
    config: MonitorConfig,
}

impl ExecutionMonitor {
    pub fn new(
        engine: Arc<dyn EngineApi>,
        registry: ProgressRegistry,
        relay: NotificationRelay,
        config: MonitorConfig,
    ) -> Self {
        Self {
            engine,
            registry,
            relay,
            config,
        }
    }

    /// Spawn the monitor task for a registered job.
    pub async fn spawn(&self, job_id: String, execution_id: String) -> tokio::task::JoinHandle<()> {
        let cancel = self
            .registry
            .cancel_token(&job_id)
            .await
            .unwrap_or_default();
        let monitor = self.clone();
        tokio::spawn(async move { monitor.run(job_id, execution_id, cancel).await })
    }

    /// Poll one execution to its end. Re-running against an already-terminal
    /// job is a no-op.
    pub async fn run(&self, job_id: String, execution_id: String, cancel: CancellationToken) {
        let Some(job) = self.registry.get(&job_id).await else {
            return;
        };
        if job.is_terminal() {
            return;
        }
        let notify_address = job.notify_address.clone();
        let filename = job.filename.clone();

        self.registry
            .update(&job_id, |job| {
                job.execution_id = Some(execution_id.clone());
                job.advance(JobStatus::Processing);
                job.raise_progress(PROGRESS_FLOOR);
            })
            .await;

        if let Some(address) = notify_address.as_deref() {
            self.relay.notify_started(address, &filename).await;
        }

        let started = Instant::now();
        let mut stepper = ThresholdStepper::new(self.config.notify_step_secs);
        let mut consecutive_failures = 0u32;

        loop {
            if started.elapsed() >= self.config.timeout {
                tracing::warn!(
                    job_id = %job_id,
                    execution_id = %execution_id,
                    timeout_secs = self.config.timeout.as_secs(),
                    "Execution tracking timed out"
                );
                self.fail(
                    &job_id,
                    FailureCause::Timeout,
                    "Gave up waiting for the execution to finish",
                    notify_address.as_deref(),
                    &filename,
                )
                .await;
                return;
            }

            match self.engine.fetch_execution(&execution_id).await {
                Ok(execution) if execution.finished => {
                    self.finish(
                        &job_id,
                        &execution,
                        notify_address.as_deref(),
                        &filename,
                        &cancel,
                    )
                    .await;
                    return;
                }
                Ok(_) => {
                    consecutive_failures = 0;
                    let elapsed = started.elapsed().as_secs_f64();
                    let percent = estimate_progress(elapsed, self.config.typical_duration_secs);
                    let remaining =
                        estimate_remaining_seconds(elapsed, self.config.typical_duration_secs);

                    let live = self
                        .registry
                        .update(&job_id, |job| {
                            job.raise_progress(percent);
                            job.estimated_remaining_seconds = Some(remaining);
                        })
                        .await;
                    if !live {
                        return;
                    }

                    if stepper.crossed(elapsed as u64) {
                        if let Some(address) = notify_address.as_deref() {
                            self.relay
                                .notify_still_processing(address, &filename, elapsed as u64)
                                .await;
                        }
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    if consecutive_failures >= 2 {
                        tracing::warn!(
                            job_id = %job_id,
                            execution_id = %execution_id,
                            error = %e,
                            "Lost track of execution after consecutive poll failures"
                        );
                        self.fail(
                            &job_id,
                            FailureCause::TrackingLost,
                            &format!("Lost track of the execution: {}", e),
                            notify_address.as_deref(),
                            &filename,
                        )
                        .await;
                        return;
                    }
                    tracing::warn!(
                        job_id = %job_id,
                        execution_id = %execution_id,
                        error = %e,
                        "Execution poll failed, retrying once"
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(job_id = %job_id, execution_id = %execution_id, "Monitor cancelled");
                    return;
                }
                _ = sleep(self.config.poll_interval) => {}
            }
        }
    }

    async fn finish(
        &self,
        job_id: &str,
        execution: &RemoteExecution,
        notify_address: Option<&str>,
        filename: &str,
        cancel: &CancellationToken,
    ) {
        let Some(job) = self.registry.get(job_id).await else {
            return;
        };
        if job.is_terminal() {
            return;
        }

        if execution.success {
            self.replay_completion(job_id, execution, cancel).await;

            let mut transitioned = false;
            self.registry
                .update(job_id, |job| {
                    transitioned = job.mark_completed();
                })
                .await;

            tracing::info!(job_id = %job_id, execution_id = %execution.id, "Execution completed");
            if transitioned {
                if let Some(address) = notify_address {
                    self.relay.notify_completed(address, filename).await;
                }
            }
        } else {
            let message = execution
                .error
                .clone()
                .unwrap_or_else(|| "Execution failed".to_string());
            self.fail(
                job_id,
                FailureCause::RemoteError,
                &message,
                notify_address,
                filename,
            )
            .await;
        }
    }

    /// Walk progress from the last known percentage to 100 over the
    /// execution's measured duration, one step per second, so the jump to
    /// done reads as motion rather than a teleport. The walk is capped at
    /// `MAX_REPLAY_SECS` no matter what span the engine reports.
    async fn replay_completion(
        &self,
        job_id: &str,
        execution: &RemoteExecution,
        cancel: &CancellationToken,
    ) {
        let Some(duration_secs) = execution.measured_duration_secs() else {
            return;
        };
        let Some(job) = self.registry.get(job_id).await else {
            return;
        };

        let from = job.progress_percent;
        let steps = (duration_secs.round() as u64).min(MAX_REPLAY_SECS);
        if steps == 0 || from >= 100 {
            return;
        }

        let span = (100 - from) as f64;
        for step in 1..=steps {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = sleep(Duration::from_secs(1)) => {}
            }
            let percent = from as f64 + span * (step as f64 / steps as f64);
            let live = self
                .registry
                .update(job_id, |job| job.raise_progress(percent.floor() as u8))
                .await;
            if !live {
                return;
            }
        }
    }

    async fn fail(
        &self,
        job_id: &str,
        cause: FailureCause,
        message: &str,
        notify_address: Option<&str>,
        filename: &str,
    ) {
        let mut transitioned = false;
        self.registry
            .update(job_id, |job| {
                transitioned = job.mark_failed(cause, message);
            })
            .await;

        if transitioned {
            if let Some(address) = notify_address {
                self.relay.notify_failed(address, filename, message).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use paperflow_core::models::UploadJob;
    use paperflow_engine::{
        DispatchOutcome, DispatchRequest, EngineError, ExecutionStatus, NotifySink,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedEngine {
        responses: Mutex<VecDeque<Result<RemoteExecution, EngineError>>>,
    }

    impl ScriptedEngine {
        fn new(responses: Vec<Result<RemoteExecution, EngineError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl EngineApi for ScriptedEngine {
        async fn dispatch(
            &self,
            _request: &DispatchRequest,
        ) -> Result<DispatchOutcome, EngineError> {
            Ok(DispatchOutcome { execution_id: None })
        }

        async fn fetch_execution(
            &self,
            execution_id: &str,
        ) -> Result<RemoteExecution, EngineError> {
            let mut responses = self.responses.lock().unwrap();
            responses
                .pop_front()
                .unwrap_or_else(|| Ok(running(execution_id)))
        }
    }

    struct RecordingSink {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NotifySink for RecordingSink {
        async fn send(&self, _address: &str, message: &str) -> Result<(), EngineError> {
            self.sent.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    fn running(id: &str) -> RemoteExecution {
        RemoteExecution {
            id: id.to_string(),
            status: ExecutionStatus::Running,
            finished: false,
            success: false,
            started_at: None,
            stopped_at: None,
            error: None,
        }
    }

    fn succeeded(id: &str, duration_secs: i64) -> RemoteExecution {
        let started = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        RemoteExecution {
            id: id.to_string(),
            status: ExecutionStatus::Success,
            finished: true,
            success: true,
            started_at: Some(started),
            stopped_at: Some(started + chrono::Duration::seconds(duration_secs)),
            error: None,
        }
    }

    fn errored(id: &str, message: &str) -> RemoteExecution {
        RemoteExecution {
            id: id.to_string(),
            status: ExecutionStatus::Error,
            finished: true,
            success: false,
            started_at: None,
            stopped_at: None,
            error: Some(message.to_string()),
        }
    }

    fn poll_error() -> EngineError {
        EngineError::UnexpectedStatus(502)
    }

    fn test_config() -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_secs(1),
            typical_duration_secs: 80,
            timeout: Duration::from_secs(600),
            notify_step_secs: 30,
        }
    }

    async fn seed_job(registry: &ProgressRegistry, id: &str, notify: bool) -> CancellationToken {
        let mut job = UploadJob::new(
            id.to_string(),
            "scan.pdf".to_string(),
            "application/pdf".to_string(),
            1024,
        );
        if notify {
            job.notify_address = Some("+15550001111".to_string());
        }
        registry.upsert(job).await
    }

    fn monitor_with(
        engine: Arc<dyn EngineApi>,
        registry: ProgressRegistry,
        sink: Option<Arc<RecordingSink>>,
        config: MonitorConfig,
    ) -> ExecutionMonitor {
        let relay = match sink {
            Some(sink) => NotificationRelay::new(Some(sink as Arc<dyn NotifySink>)),
            None => NotificationRelay::disabled(),
        };
        ExecutionMonitor::new(engine, registry, relay, config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_path_completes_job() {
        let registry = ProgressRegistry::new();
        let cancel = seed_job(&registry, "job-1", false).await;
        let engine = ScriptedEngine::new(vec![
            Ok(running("ex-1")),
            Ok(running("ex-1")),
            Ok(succeeded("ex-1", 3)),
        ]);
        let monitor = monitor_with(engine, registry.clone(), None, test_config());

        monitor
            .run("job-1".to_string(), "ex-1".to_string(), cancel)
            .await;

        let job = registry.get("job-1").await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress_percent, 100);
        assert_eq!(job.execution_id.as_deref(), Some("ex-1"));
        assert_eq!(job.estimated_remaining_seconds, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_replay_is_capped_for_long_executions() {
        let registry = ProgressRegistry::new();
        let cancel = seed_job(&registry, "job-1", false).await;
        // The engine reports a multi-hour measured duration; the replay
        // must not keep the job in Processing for anywhere near that long.
        let engine = ScriptedEngine::new(vec![Ok(succeeded("ex-1", 10_000))]);
        let mut config = test_config();
        config.timeout = Duration::from_secs(5);
        let monitor = monitor_with(engine, registry.clone(), None, config);

        let begun = Instant::now();
        monitor
            .run("job-1".to_string(), "ex-1".to_string(), cancel)
            .await;

        assert!(begun.elapsed() <= Duration::from_secs(MAX_REPLAY_SECS + 2));
        let job = registry.get("job-1").await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress_percent, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_error_fails_job_with_engine_message() {
        let registry = ProgressRegistry::new();
        let cancel = seed_job(&registry, "job-1", false).await;
        let engine = ScriptedEngine::new(vec![Ok(errored("ex-1", "node timed out"))]);
        let monitor = monitor_with(engine, registry.clone(), None, test_config());

        monitor
            .run("job-1".to_string(), "ex-1".to_string(), cancel)
            .await;

        let job = registry.get("job-1").await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failure_cause, Some(FailureCause::RemoteError));
        assert_eq!(job.error_message.as_deref(), Some("node timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_consecutive_poll_failures_lose_tracking() {
        let registry = ProgressRegistry::new();
        let cancel = seed_job(&registry, "job-1", false).await;
        let engine = ScriptedEngine::new(vec![Err(poll_error()), Err(poll_error())]);
        let monitor = monitor_with(engine, registry.clone(), None, test_config());

        monitor
            .run("job-1".to_string(), "ex-1".to_string(), cancel)
            .await;

        let job = registry.get("job-1").await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failure_cause, Some(FailureCause::TrackingLost));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_transient_failure_recovers() {
        let registry = ProgressRegistry::new();
        let cancel = seed_job(&registry, "job-1", false).await;
        let engine = ScriptedEngine::new(vec![
            Err(poll_error()),
            Ok(running("ex-1")),
            Err(poll_error()),
            Ok(succeeded("ex-1", 2)),
        ]);
        let monitor = monitor_with(engine, registry.clone(), None, test_config());

        monitor
            .run("job-1".to_string(), "ex-1".to_string(), cancel)
            .await;

        let job = registry.get("job-1").await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_job() {
        let registry = ProgressRegistry::new();
        let cancel = seed_job(&registry, "job-1", false).await;
        // Empty script: every poll reports a still-running execution.
        let engine = ScriptedEngine::new(vec![]);
        let mut config = test_config();
        config.timeout = Duration::from_secs(5);
        let monitor = monitor_with(engine, registry.clone(), None, config);

        monitor
            .run("job-1".to_string(), "ex-1".to_string(), cancel)
            .await;

        let job = registry.get("job-1").await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failure_cause, Some(FailureCause::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_leaves_job_non_terminal() {
        let registry = ProgressRegistry::new();
        let cancel = seed_job(&registry, "job-1", false).await;
        let engine = ScriptedEngine::new(vec![]);
        let monitor = monitor_with(engine, registry.clone(), None, test_config());

        let handle = tokio::spawn({
            let monitor = monitor.clone();
            let cancel = cancel.clone();
            async move {
                monitor
                    .run("job-1".to_string(), "ex-1".to_string(), cancel)
                    .await
            }
        });

        tokio::time::sleep(Duration::from_secs(2)).await;
        cancel.cancel();
        handle.await.unwrap();

        let job = registry.get("job-1").await.unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert!(!job.is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_job_is_not_repolled() {
        let registry = ProgressRegistry::new();
        let cancel = seed_job(&registry, "job-1", true).await;
        registry
            .update("job-1", |job| {
                job.mark_completed();
            })
            .await;

        let sink = Arc::new(RecordingSink {
            sent: Mutex::new(Vec::new()),
        });
        let engine = ScriptedEngine::new(vec![Ok(errored("ex-1", "boom"))]);
        let monitor = monitor_with(engine, registry.clone(), Some(sink.clone()), test_config());

        monitor
            .run("job-1".to_string(), "ex-1".to_string(), cancel)
            .await;

        let job = registry.get("job-1").await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifications_sent_exactly_once_per_lifecycle() {
        let registry = ProgressRegistry::new();
        let cancel = seed_job(&registry, "job-1", true).await;
        let engine = ScriptedEngine::new(vec![Ok(running("ex-1")), Ok(succeeded("ex-1", 2))]);
        let sink = Arc::new(RecordingSink {
            sent: Mutex::new(Vec::new()),
        });
        let monitor = monitor_with(engine, registry.clone(), Some(sink.clone()), test_config());

        monitor
            .run("job-1".to_string(), "ex-1".to_string(), cancel)
            .await;

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("Processing your invoice"));
        assert!(sent[1].contains("completed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_still_processing_message_on_threshold_crossing() {
        let registry = ProgressRegistry::new();
        let cancel = seed_job(&registry, "job-1", true).await;
        // 35 running polls at 1s intervals crosses the 30s threshold once.
        let responses: Vec<_> = (0..35)
            .map(|_| Ok(running("ex-1")))
            .chain(std::iter::once(Ok(succeeded("ex-1", 1))))
            .collect();
        let engine = ScriptedEngine::new(responses);
        let sink = Arc::new(RecordingSink {
            sent: Mutex::new(Vec::new()),
        });
        let monitor = monitor_with(engine, registry.clone(), Some(sink.clone()), test_config());

        monitor
            .run("job-1".to_string(), "ex-1".to_string(), cancel)
            .await;

        let sent = sink.sent.lock().unwrap();
        let still_processing = sent
            .iter()
            .filter(|message| message.contains("Still processing"))
            .count();
        assert_eq!(still_processing, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_rises_while_running() {
        let registry = ProgressRegistry::new();
        let cancel = seed_job(&registry, "job-1", false).await;
        let engine = ScriptedEngine::new(vec![]);
        let mut config = test_config();
        config.timeout = Duration::from_secs(40);
        let monitor = monitor_with(engine, registry.clone(), None, config);

        let handle = tokio::spawn({
            let monitor = monitor.clone();
            let cancel = cancel.clone();
            async move {
                monitor
                    .run("job-1".to_string(), "ex-1".to_string(), cancel)
                    .await
            }
        });

        tokio::time::sleep(Duration::from_secs(20)).await;
        let mid = registry.get("job-1").await.unwrap();
        assert!(mid.progress_percent > PROGRESS_FLOOR);
        assert!(mid.progress_percent < 100);

        handle.await.unwrap();
        let done = registry.get("job-1").await.unwrap();
        assert!(done.progress_percent >= mid.progress_percent);
    }
}
