// Worker - claims queued jobs and hands them to the orchestrator

mod shutdown;

pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::constants::{ERROR_RECOVERY_SLEEP_DURATION, IDLE_SLEEP_DURATION};
use crate::application::orchestrator::Orchestrator;
use crate::error::Result;
use crate::port::{JobStore, TimeProvider};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};
use tokio::time::sleep;
use tracing::{error, info};

/// Worker polls the job store for QUEUED jobs and runs each one in its own task,
/// at most `max_concurrent_jobs` at a time.
pub struct Worker {
    jobs: Arc<dyn JobStore>,
    orchestrator: Arc<Orchestrator>,
    time: Arc<dyn TimeProvider>,
    slots: Arc<Semaphore>,
    wakeup: Arc<Notify>,
}

impl Worker {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        orchestrator: Arc<Orchestrator>,
        time: Arc<dyn TimeProvider>,
        wakeup: Arc<Notify>,
    ) -> Self {
        let slots = Arc::new(Semaphore::new(
            orchestrator.config().max_concurrent_jobs.max(1),
        ));
        Self {
            jobs,
            orchestrator,
            time,
            slots,
            wakeup,
        }
    }

    /// Run worker loop with graceful shutdown support
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!("Worker started");
        loop {
            if shutdown.is_shutdown() {
                break;
            }

            match self.dispatch_next().await {
                Ok(true) => continue,
                Ok(false) => {
                    // Queue empty or all slots busy
                    tokio::select! {
                        _ = sleep(IDLE_SLEEP_DURATION) => {},
                        _ = self.wakeup.notified() => {},
                        _ = shutdown.wait() => break,
                    }
                }
                Err(e) => {
                    error!(error = %e, "Worker error");
                    tokio::select! {
                        _ = sleep(ERROR_RECOVERY_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => break,
                    }
                }
            }
        }
        info!("Worker stopped");
        Ok(())
    }

    /// Claim one job and spawn it. Returns false when nothing was started.
    pub async fn dispatch_next(&self) -> Result<bool> {
        let Ok(slot) = Arc::clone(&self.slots).try_acquire_owned() else {
            return Ok(false);
        };

        let Some(job) = self.jobs.claim_next(self.time.now_millis()).await? else {
            return Ok(false);
        };

        info!(job_id = %job.id, target = %job.target.url, "Job claimed");
        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::spawn(async move {
            orchestrator.run(job).await;
            drop(slot);
        });
        Ok(true)
    }

    /// Slots currently held by running jobs
    pub fn active_jobs(&self) -> usize {
        self.orchestrator.config().max_concurrent_jobs.max(1) - self.slots.available_permits()
    }
}
