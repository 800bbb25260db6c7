// Maintenance Service
// Scheduled GC of finished jobs and admission records, VACUUM over the size limit

use crate::application::worker::ShutdownToken;
use crate::error::Result;
use crate::port::{Maintenance, MaintenanceConfig, MaintenanceStats};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

/// Maintenance scheduler
///
/// Runs periodic maintenance in the background until shutdown
pub struct MaintenanceScheduler {
    maintenance: Arc<dyn Maintenance>,
    config: MaintenanceConfig,
}

impl MaintenanceScheduler {
    pub fn new(maintenance: Arc<dyn Maintenance>, config: MaintenanceConfig) -> Self {
        Self {
            maintenance,
            config,
        }
    }

    /// Maintenance loop. The first tick fires immediately.
    pub async fn run(self, mut shutdown: ShutdownToken) {
        let hours = self.config.interval_hours.max(1);
        info!(
            interval_hours = hours,
            retention_days = self.config.finished_job_retention_days,
            "Maintenance scheduler started"
        );

        let mut tick = interval(Duration::from_secs(hours * 3600));
        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = shutdown.wait() => break,
            }
            if shutdown.is_shutdown() {
                break;
            }

            match self.maintenance.run_full_maintenance(&self.config).await {
                Ok(stats) => info!(
                    db_size_mb = stats.db_size_mb,
                    job_count = stats.job_count,
                    finished_jobs = stats.finished_job_count,
                    snapshots = stats.snapshot_count,
                    cohorts = stats.cohort_count,
                    "Scheduled maintenance completed"
                ),
                Err(e) => error!(error = %e, "Scheduled maintenance failed"),
            }
        }
        info!("Maintenance scheduler stopped");
    }

    /// Run maintenance immediately (manual trigger)
    pub async fn run_now(&self) -> Result<MaintenanceStats> {
        info!("Running manual maintenance");
        self.maintenance.run_full_maintenance(&self.config).await
    }
}
