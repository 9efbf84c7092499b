//! Progress registry
//!
//! Shared in-memory view of every upload job in flight. A cloneable handle
//! over an async RwLock; updates are upsert-by-id with last-write-wins, and
//! readers get point-in-time snapshots. Each job carries a cancellation
//! token its monitor task watches.

use paperflow_core::models::UploadJob;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

struct JobEntry {
    job: UploadJob,
    cancel: CancellationToken,
}

#[derive(Clone, Default)]
pub struct ProgressRegistry {
    inner: Arc<RwLock<HashMap<String, JobEntry>>>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a job, returning the cancellation token its monitor
    /// should watch. Replacing an existing id keeps the existing token so a
    /// running monitor stays cancellable.
    pub async fn upsert(&self, job: UploadJob) -> CancellationToken {
        let mut jobs = self.inner.write().await;
        match jobs.get_mut(&job.id) {
            Some(entry) => {
                entry.job = job;
                entry.cancel.clone()
            }
            None => {
                let cancel = CancellationToken::new();
                jobs.insert(
                    job.id.clone(),
                    JobEntry {
                        job,
                        cancel: cancel.clone(),
                    },
                );
                cancel
            }
        }
    }

    pub async fn get(&self, id: &str) -> Option<UploadJob> {
        self.inner.read().await.get(id).map(|entry| entry.job.clone())
    }

    /// Snapshot of all jobs, newest first.
    pub async fn list(&self) -> Vec<UploadJob> {
        let jobs = self.inner.read().await;
        let mut snapshot: Vec<UploadJob> =
            jobs.values().map(|entry| entry.job.clone()).collect();
        snapshot.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        snapshot
    }

    /// Apply a mutation to one job under the write lock. Returns false when
    /// the job is gone.
    pub async fn update<F>(&self, id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut UploadJob),
    {
        let mut jobs = self.inner.write().await;
        match jobs.get_mut(id) {
            Some(entry) => {
                mutate(&mut entry.job);
                true
            }
            None => false,
        }
    }

    /// Cancel the job's monitor and drop the entry.
    pub async fn remove(&self, id: &str) -> Option<UploadJob> {
        let mut jobs = self.inner.write().await;
        jobs.remove(id).map(|entry| {
            entry.cancel.cancel();
            entry.job
        })
    }

    pub async fn cancel_token(&self, id: &str) -> Option<CancellationToken> {
        self.inner
            .read()
            .await
            .get(id)
            .map(|entry| entry.cancel.clone())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperflow_core::models::JobStatus;

    fn job(id: &str) -> UploadJob {
        UploadJob::new(
            id.to_string(),
            format!("{}.pdf", id),
            "application/pdf".to_string(),
            1024,
        )
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let registry = ProgressRegistry::new();
        registry.upsert(job("a")).await;

        let fetched = registry.get("a").await.unwrap();
        assert_eq!(fetched.filename, "a.pdf");
        assert!(registry.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_upsert_is_last_write_wins() {
        let registry = ProgressRegistry::new();
        registry.upsert(job("a")).await;

        let mut replacement = job("a");
        replacement.progress_percent = 50;
        registry.upsert(replacement).await;

        assert_eq!(registry.get("a").await.unwrap().progress_percent, 50);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_upsert_keeps_existing_cancel_token() {
        let registry = ProgressRegistry::new();
        let token = registry.upsert(job("a")).await;
        let token_again = registry.upsert(job("a")).await;

        token_again.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_update_mutates_in_place() {
        let registry = ProgressRegistry::new();
        registry.upsert(job("a")).await;

        let updated = registry
            .update("a", |job| {
                job.advance(JobStatus::Processing);
                job.raise_progress(40);
            })
            .await;
        assert!(updated);

        let fetched = registry.get("a").await.unwrap();
        assert_eq!(fetched.status, JobStatus::Processing);
        assert_eq!(fetched.progress_percent, 40);

        assert!(!registry.update("missing", |_| {}).await);
    }

    #[tokio::test]
    async fn test_remove_cancels_token() {
        let registry = ProgressRegistry::new();
        let token = registry.upsert(job("a")).await;

        let removed = registry.remove("a").await.unwrap();
        assert_eq!(removed.id, "a");
        assert!(token.is_cancelled());
        assert!(registry.get("a").await.is_none());
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let registry = ProgressRegistry::new();
        let mut first = job("first");
        first.started_at = chrono::Utc::now() - chrono::Duration::seconds(60);
        registry.upsert(first).await;
        registry.upsert(job("second")).await;

        let jobs = registry.list().await;
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, "second");
        assert_eq!(jobs[1].id, "first");
    }
}
