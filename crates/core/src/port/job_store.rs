// Job Store Port (Interface)

use crate::domain::{Job, JobId, JobPatch, JobStatus};
use crate::error::Result;
use async_trait::async_trait;

/// Durable job records
///
/// `update` is the only mutation path after `create`. Implementations apply a patch
/// atomically and refuse backward transitions and any change to a terminal job
/// (`AppError::InvalidState`).
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job, returning its id
    async fn create(&self, job: &Job) -> Result<JobId>;

    /// Fetch a job for its owner. `NotFound` if absent, `Forbidden` if owned by another key.
    async fn get(&self, id: &str, owner_key: &str) -> Result<Job>;

    /// Apply a patch atomically
    async fn update(&self, id: &str, patch: &JobPatch) -> Result<()>;

    /// Atomically move the oldest QUEUED job to RUNNING and return it
    async fn claim_next(&self, now_millis: i64) -> Result<Option<Job>>;

    /// All jobs in a status, oldest first
    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>>;

    /// Jobs left RUNNING (startup recovery input)
    async fn list_running(&self) -> Result<Vec<Job>> {
        self.list_by_status(JobStatus::Running).await
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<i64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::DomainError;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// In-memory JobStore with the same guards as the SQLite store
    #[derive(Default)]
    pub struct InMemoryJobStore {
        jobs: Arc<Mutex<HashMap<JobId, Job>>>,
        update_calls: AtomicUsize,
        fail_updates: AtomicBool,
        fail_completion: AtomicBool,
    }

    impl InMemoryJobStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every subsequent `update` fail with a database error
        pub fn fail_updates(&self, fail: bool) {
            self.fail_updates.store(fail, Ordering::SeqCst);
        }

        /// Make only the patch that completes a job fail
        pub fn fail_completion(&self, fail: bool) {
            self.fail_completion.store(fail, Ordering::SeqCst);
        }

        pub fn update_calls(&self) -> usize {
            self.update_calls.load(Ordering::SeqCst)
        }

        /// Read without the owner check (test assertions)
        pub fn snapshot(&self, id: &str) -> Option<Job> {
            self.jobs.lock().unwrap().get(id).cloned()
        }

        /// Overwrite a record, bypassing transition guards (simulates a crash mid-run)
        pub fn force(&self, job: Job) {
            self.jobs.lock().unwrap().insert(job.id.clone(), job);
        }
    }

    #[async_trait]
    impl JobStore for InMemoryJobStore {
        async fn create(&self, job: &Job) -> Result<JobId> {
            let mut jobs = self.jobs.lock().unwrap();
            if jobs.contains_key(&job.id) {
                return Err(AppError::Conflict(format!("Job {} already exists", job.id)));
            }
            jobs.insert(job.id.clone(), job.clone());
            Ok(job.id.clone())
        }

        async fn get(&self, id: &str, owner_key: &str) -> Result<Job> {
            let jobs = self.jobs.lock().unwrap();
            let job = jobs
                .get(id)
                .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))?;
            if job.owner_key != owner_key {
                return Err(AppError::Forbidden(format!(
                    "Job {} belongs to another key",
                    id
                )));
            }
            Ok(job.clone())
        }

        async fn update(&self, id: &str, patch: &JobPatch) -> Result<()> {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_updates.load(Ordering::SeqCst) {
                return Err(AppError::Database("simulated write failure".to_string()));
            }
            if self.fail_completion.load(Ordering::SeqCst)
                && patch.status == Some(JobStatus::Complete)
            {
                return Err(AppError::Database("simulated completion failure".to_string()));
            }

            let mut jobs = self.jobs.lock().unwrap();
            let job = jobs
                .get_mut(id)
                .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))?;
            job.apply(patch).map_err(|e| match e {
                DomainError::MalformedPatch(_) => AppError::Domain(e),
                other => AppError::InvalidState(other.to_string()),
            })
        }

        async fn claim_next(&self, now_millis: i64) -> Result<Option<Job>> {
            let mut jobs = self.jobs.lock().unwrap();
            let next_id = jobs
                .values()
                .filter(|j| j.status == JobStatus::Queued)
                .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
                .map(|j| j.id.clone());

            let Some(id) = next_id else {
                return Ok(None);
            };
            let job = jobs
                .get_mut(&id)
                .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))?;
            job.apply(&JobPatch::start(now_millis))?;
            Ok(Some(job.clone()))
        }

        async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>> {
            let jobs = self.jobs.lock().unwrap();
            let mut found: Vec<Job> = jobs.values().filter(|j| j.status == status).cloned().collect();
            found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            Ok(found)
        }

        async fn count_by_status(&self, status: JobStatus) -> Result<i64> {
            let jobs = self.jobs.lock().unwrap();
            Ok(jobs.values().filter(|j| j.status == status).count() as i64)
        }
    }
}
