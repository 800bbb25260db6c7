// DB Maintenance port
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;

/// Database maintenance statistics
#[derive(Debug, Clone, Default)]
pub struct MaintenanceStats {
    pub db_size_mb: f64,
    pub job_count: i64,
    pub finished_job_count: i64,
    pub snapshot_count: i64,
    pub cohort_count: i64,
}

/// Maintenance configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Keep terminal jobs finished within this many days
    pub finished_job_retention_days: i64,

    /// Keep rate-window hits and quota rows for this many days
    pub admission_retention_days: i64,

    /// VACUUM once the database grows past this size (MB)
    pub max_db_size_mb: f64,

    /// How often the scheduler runs (hours)
    pub interval_hours: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            finished_job_retention_days: 7,
            admission_retention_days: 2,
            max_db_size_mb: 1000.0,
            interval_hours: 24,
        }
    }
}

/// Database maintenance operations. Snapshots are history and are never collected.
#[async_trait]
pub trait Maintenance: Send + Sync {
    /// Run VACUUM, returning MB reclaimed
    async fn vacuum(&self) -> Result<f64>;

    /// Delete terminal jobs finished before the retention cutoff
    async fn gc_finished_jobs(&self, retention_days: i64) -> Result<i64>;

    /// Delete stale rate hits and quota rows
    async fn gc_admission_records(&self, retention_days: i64) -> Result<i64>;

    async fn get_stats(&self) -> Result<MaintenanceStats>;

    /// GC, then VACUUM if the database is over the size limit
    async fn run_full_maintenance(&self, config: &MaintenanceConfig) -> Result<MaintenanceStats> {
        let before = self.get_stats().await?;

        let deleted_jobs = self
            .gc_finished_jobs(config.finished_job_retention_days)
            .await?;
        let deleted_admission_rows = self
            .gc_admission_records(config.admission_retention_days)
            .await?;

        let reclaimed_mb = if before.db_size_mb > config.max_db_size_mb {
            self.vacuum().await?
        } else {
            0.0
        };

        let after = self.get_stats().await?;

        tracing::info!(
            deleted_jobs,
            deleted_admission_rows,
            reclaimed_mb,
            db_size_mb = after.db_size_mb,
            "Maintenance completed"
        );

        Ok(after)
    }
}
