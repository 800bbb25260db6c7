// SQLite Maintenance Implementation
use crate::error::map_sqlx_error;
use async_trait::async_trait;
use signal_core::error::Result;
use signal_core::port::time_provider::utc_date;
use signal_core::port::{Maintenance, MaintenanceStats, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// SQLite maintenance implementation
pub struct SqliteMaintenance {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteMaintenance {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    /// DB file size in MB
    async fn get_db_size(&self) -> Result<f64> {
        let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok((page_count * page_size) as f64 / (1024.0 * 1024.0))
    }

    async fn count(&self, sql: &str) -> Result<i64> {
        sqlx::query_scalar(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    fn cutoff(&self, retention_days: i64) -> i64 {
        self.time_provider.now_millis() - retention_days * DAY_MS
    }
}

#[async_trait]
impl Maintenance for SqliteMaintenance {
    async fn vacuum(&self) -> Result<f64> {
        info!("Running VACUUM to optimize database...");

        let size_before = self.get_db_size().await?;
        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        let size_after = self.get_db_size().await?;
        let reclaimed = (size_before - size_after).max(0.0);

        info!(
            size_before_mb = size_before,
            size_after_mb = size_after,
            reclaimed_mb = reclaimed,
            "VACUUM completed"
        );

        Ok(reclaimed)
    }

    async fn gc_finished_jobs(&self, retention_days: i64) -> Result<i64> {
        let cutoff_time = self.cutoff(retention_days);
        info!(retention_days, cutoff_time, "Running finished job GC");

        // Snapshots are separate rows and survive their job
        let result = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE status IN ('complete', 'failed')
              AND finished_at IS NOT NULL
              AND finished_at < ?
            "#,
        )
        .bind(cutoff_time)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let deleted = result.rows_affected() as i64;
        info!(deleted_jobs = deleted, "Finished job GC completed");
        Ok(deleted)
    }

    async fn gc_admission_records(&self, retention_days: i64) -> Result<i64> {
        let cutoff_time = self.cutoff(retention_days);
        let cutoff_day = utc_date(cutoff_time);

        let hits = sqlx::query("DELETE FROM rate_hits WHERE at_millis < ?")
            .bind(cutoff_time)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        // ISO dates compare correctly as text
        let quota = sqlx::query("DELETE FROM quota_usage WHERE day < ?")
            .bind(&cutoff_day)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let deleted = (hits.rows_affected() + quota.rows_affected()) as i64;
        info!(deleted_admission_rows = deleted, cutoff_day = %cutoff_day, "Admission GC completed");
        Ok(deleted)
    }

    async fn get_stats(&self) -> Result<MaintenanceStats> {
        Ok(MaintenanceStats {
            db_size_mb: self.get_db_size().await?,
            job_count: self.count("SELECT COUNT(*) FROM jobs").await?,
            finished_job_count: self
                .count("SELECT COUNT(*) FROM jobs WHERE status IN ('complete', 'failed')")
                .await?,
            snapshot_count: self.count("SELECT COUNT(*) FROM snapshots").await?,
            cohort_count: self.count("SELECT COUNT(*) FROM cohorts").await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations, SqliteJobStore};
    use signal_core::domain::{Job, JobPatch, ReportStyle, Target};
    use signal_core::port::time_provider::mocks::MockTimeProvider;
    use signal_core::port::{JobStore, MaintenanceConfig};

    const NOW: i64 = 1_704_110_400_000; // 2024-01-01 12:00 UTC

    async fn setup() -> (SqlitePool, SqliteMaintenance) {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let maintenance = SqliteMaintenance::new(pool.clone(), Arc::new(MockTimeProvider::new(NOW)));
        (pool, maintenance)
    }

    async fn failed_job(store: &SqliteJobStore, id: &str, finished_at: i64) {
        let job = Job::new(
            id,
            "key-a",
            Target::new("https://acme.io/", None),
            None,
            ReportStyle::Standard,
            finished_at - 1_000,
        );
        store.create(&job).await.unwrap();
        store
            .update(id, &JobPatch::fail("probe fleet down", finished_at))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_maintenance_stats() {
        let (_pool, maintenance) = setup().await;
        let stats = maintenance.get_stats().await.unwrap();

        assert!(stats.db_size_mb > 0.0);
        assert_eq!(stats.job_count, 0);
        assert_eq!(stats.snapshot_count, 0);
        assert_eq!(stats.cohort_count, 0);
    }

    #[tokio::test]
    async fn test_vacuum() {
        let (_pool, maintenance) = setup().await;
        let reclaimed = maintenance.vacuum().await.unwrap();
        assert!(reclaimed >= 0.0);
    }

    #[tokio::test]
    async fn test_gc_finished_jobs_respects_retention() {
        let (pool, maintenance) = setup().await;
        let store = SqliteJobStore::new(pool);
        failed_job(&store, "old", NOW - 10 * DAY_MS).await;
        failed_job(&store, "recent", NOW - DAY_MS).await;

        assert_eq!(maintenance.gc_finished_jobs(7).await.unwrap(), 1);
        assert!(store.get("old", "key-a").await.is_err());
        assert!(store.get("recent", "key-a").await.is_ok());
    }

    #[tokio::test]
    async fn test_gc_admission_records() {
        let (pool, maintenance) = setup().await;
        sqlx::query("INSERT INTO rate_hits (owner_key, at_millis) VALUES ('key-a', ?), ('key-a', ?)")
            .bind(NOW - 3 * DAY_MS)
            .bind(NOW - 1_000)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO quota_usage (owner_key, day, used) VALUES ('key-a', '2023-12-25', 4), ('key-a', '2024-01-01', 2)",
        )
        .execute(&pool)
        .await
        .unwrap();

        assert_eq!(maintenance.gc_admission_records(2).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_full_maintenance_keeps_snapshots() {
        let (pool, maintenance) = setup().await;
        sqlx::query(
            "INSERT INTO snapshots (owner_key, target_url, profile_json, created_at) VALUES ('key-a', 'https://acme.io/', '{}', 0)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let stats = maintenance
            .run_full_maintenance(&MaintenanceConfig::default())
            .await
            .unwrap();
        assert_eq!(stats.snapshot_count, 1);
    }
}
