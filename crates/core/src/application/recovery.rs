// Startup recovery: no job stays RUNNING across a restart
use crate::application::constants::RECOVERY_ERROR;
use crate::domain::{JobId, JobPatch, JobStatus};
use crate::error::Result;
use crate::port::{JobStore, TimeProvider};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Jobs moved RUNNING -> FAILED
    pub failed: Vec<JobId>,
    /// QUEUED jobs left for the worker to pick up
    pub queued: i64,
}

/// Crash recovery service
///
/// A RUNNING job found at startup belongs to a process that no longer exists.
/// Its probes are gone, so it is failed rather than resumed. QUEUED jobs are
/// untouched: the worker claims them like any new submission.
pub struct RecoveryService {
    jobs: Arc<dyn JobStore>,
    time: Arc<dyn TimeProvider>,
}

impl RecoveryService {
    pub fn new(jobs: Arc<dyn JobStore>, time: Arc<dyn TimeProvider>) -> Self {
        Self { jobs, time }
    }

    pub async fn recover(&self) -> Result<RecoveryReport> {
        let now = self.time.now_millis();
        let running = self.jobs.list_running().await?;

        let mut report = RecoveryReport::default();
        for job in running {
            warn!(
                job_id = %job.id,
                started_at = ?job.started_at,
                progress = job.progress,
                "Job was running at shutdown, marking failed"
            );
            self.jobs
                .update(&job.id, &JobPatch::fail(RECOVERY_ERROR, now))
                .await?;
            report.failed.push(job.id);
        }

        report.queued = self.jobs.count_by_status(JobStatus::Queued).await?;

        info!(
            failed = report.failed.len(),
            queued = report.queued,
            "Startup recovery complete"
        );
        Ok(report)
    }
}
