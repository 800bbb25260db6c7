// SQLite JobStore Implementation

use crate::error::{corrupt_row, map_sqlx_error};
use async_trait::async_trait;
use signal_core::domain::{Job, JobId, JobPatch, JobResult, JobStatus, Target};
use signal_core::error::{AppError, Result};
use signal_core::port::JobStore;
use sqlx::SqlitePool;

pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create(&self, job: &Job) -> Result<JobId> {
        let result_json = job
            .result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, owner_key, target_url, target_name, focus, style,
                status, progress, created_at, started_at, finished_at,
                result_json, error
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.owner_key)
        .bind(&job.target.url)
        .bind(&job.target.name)
        .bind(&job.focus)
        .bind(job.style.as_str())
        .bind(job.status.as_str())
        .bind(job.progress as i64)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(&result_json)
        .bind(&job.error)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(job.id.clone())
    }

    async fn get(&self, id: &str, owner_key: &str) -> Result<Job> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))?;

        if row.owner_key != owner_key {
            return Err(AppError::Forbidden(format!(
                "Job {} belongs to another key",
                id
            )));
        }
        row.into_job()
    }

    async fn update(&self, id: &str, patch: &JobPatch) -> Result<()> {
        patch.validate()?;

        let status = patch.status.map(|s| s.as_str());
        let result_json = patch
            .result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        // Single conditional statement: progress never decreases, stays below 100 until
        // complete, terminal rows are immutable, and only forward transitions match.
        // Every SET expression reads the pre-update row.
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = COALESCE(?1, status),
                progress = CASE
                    WHEN COALESCE(?1, status) = 'complete' THEN MAX(progress, COALESCE(?2, progress))
                    ELSE MIN(MAX(progress, COALESCE(?2, progress)), 99)
                END,
                started_at = COALESCE(?3, started_at),
                finished_at = COALESCE(?4, finished_at),
                result_json = COALESCE(?5, result_json),
                error = COALESCE(?6, error)
            WHERE id = ?7
              AND status IN ('queued', 'running')
              AND (
                  ?1 IS NULL
                  OR ?1 = status
                  OR (status = 'queued' AND ?1 IN ('running', 'failed'))
                  OR (status = 'running' AND ?1 IN ('complete', 'failed'))
              )
            "#,
        )
        .bind(status)
        .bind(patch.progress.map(i64::from))
        .bind(patch.started_at)
        .bind(patch.finished_at)
        .bind(&result_json)
        .bind(&patch.error)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let current: Option<String> = sqlx::query_scalar("SELECT status FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        match current {
            None => Err(AppError::NotFound(format!("Job {} not found", id))),
            Some(current) => Err(AppError::InvalidState(format!(
                "Cannot update job {} from {} to {}",
                id,
                current,
                status.unwrap_or(current.as_str())
            ))),
        }
    }

    async fn claim_next(&self, now_millis: i64) -> Result<Option<Job>> {
        let start = JobPatch::start(now_millis);

        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs
            SET status = 'running', progress = MAX(progress, ?), started_at = ?
            WHERE id = (
                SELECT id FROM jobs
                WHERE status = 'queued'
                ORDER BY created_at ASC, id ASC
                LIMIT 1
            )
              AND status = 'queued'
            RETURNING *
            "#,
        )
        .bind(start.progress.map(i64::from))
        .bind(start.started_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT * FROM jobs
            WHERE status = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    owner_key: String,
    target_url: String,
    target_name: Option<String>,
    focus: Option<String>,
    style: String,
    status: String,
    progress: i64,
    created_at: i64,
    started_at: Option<i64>,
    finished_at: Option<i64>,
    result_json: Option<String>,
    error: Option<String>,
}

impl JobRow {
    fn into_job(self) -> Result<Job> {
        let status: JobStatus = self
            .status
            .parse()
            .map_err(|e| corrupt_row("jobs", &self.id, e))?;
        let style = self
            .style
            .parse()
            .map_err(|e| corrupt_row("jobs", &self.id, e))?;
        let result: Option<JobResult> = self
            .result_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| corrupt_row("jobs", &self.id, e))?;
        let progress =
            u8::try_from(self.progress).map_err(|e| corrupt_row("jobs", &self.id, e))?;

        Ok(Job {
            id: self.id,
            owner_key: self.owner_key,
            target: Target {
                url: self.target_url,
                name: self.target_name,
            },
            focus: self.focus,
            style,
            status,
            progress,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            result,
            error: self.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use signal_core::domain::{
        Company, CompanyProfile, Report, ReportSource, ReportStyle,
    };

    async fn setup_store() -> SqliteJobStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteJobStore::new(pool)
    }

    fn job(id: &str, created_at: i64) -> Job {
        Job::new(
            id,
            "key-a",
            Target::new("https://acme.io/", Some("Acme".to_string())),
            Some("pricing and hiring".to_string()),
            ReportStyle::Investor,
            created_at,
        )
    }

    fn result() -> JobResult {
        JobResult {
            profile: CompanyProfile::new(Company {
                name: "Acme".to_string(),
                url: "https://acme.io/".to_string(),
            }),
            report: Report::new("Acme", None, ReportStyle::Investor, ReportSource::Fallback),
            delta: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = setup_store().await;
        store.create(&job("job-1", 1_000)).await.unwrap();

        let found = store.get("job-1", "key-a").await.unwrap();
        assert_eq!(found.status, JobStatus::Queued);
        assert_eq!(found.target.name.as_deref(), Some("Acme"));
        assert_eq!(found.style, ReportStyle::Investor);
        assert_eq!(found.focus.as_deref(), Some("pricing and hiring"));
    }

    #[tokio::test]
    async fn test_get_checks_owner() {
        let store = setup_store().await;
        store.create(&job("job-1", 1_000)).await.unwrap();

        assert!(matches!(
            store.get("job-1", "key-b").await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            store.get("missing", "key-a").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let store = setup_store().await;
        store.create(&job("job-1", 1_000)).await.unwrap();
        assert!(matches!(
            store.create(&job("job-1", 2_000)).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_claim_next_is_fifo() {
        let store = setup_store().await;
        store.create(&job("job-b", 2_000)).await.unwrap();
        store.create(&job("job-a", 1_000)).await.unwrap();

        let first = store.claim_next(5_000).await.unwrap().unwrap();
        assert_eq!(first.id, "job-a");
        assert_eq!(first.status, JobStatus::Running);
        assert_eq!(first.progress, 10);
        assert_eq!(first.started_at, Some(5_000));

        let second = store.claim_next(6_000).await.unwrap().unwrap();
        assert_eq!(second.id, "job-b");
        assert!(store.claim_next(7_000).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_progress_never_decreases_and_caps() {
        let store = setup_store().await;
        store.create(&job("job-1", 1_000)).await.unwrap();
        store.claim_next(2_000).await.unwrap();

        store.update("job-1", &JobPatch::progress(60)).await.unwrap();
        store.update("job-1", &JobPatch::progress(30)).await.unwrap();
        assert_eq!(store.get("job-1", "key-a").await.unwrap().progress, 60);

        let raw = JobPatch {
            progress: Some(100),
            ..Default::default()
        };
        store.update("job-1", &raw).await.unwrap();
        assert_eq!(store.get("job-1", "key-a").await.unwrap().progress, 99);
    }

    #[tokio::test]
    async fn test_complete_stores_result() {
        let store = setup_store().await;
        store.create(&job("job-1", 1_000)).await.unwrap();
        store.claim_next(2_000).await.unwrap();
        store
            .update("job-1", &JobPatch::complete(result(), 3_000))
            .await
            .unwrap();

        let done = store.get("job-1", "key-a").await.unwrap();
        assert_eq!(done.status, JobStatus::Complete);
        assert_eq!(done.progress, 100);
        assert_eq!(done.finished_at, Some(3_000));
        assert_eq!(done.result.unwrap().profile.company.name, "Acme");
        assert!(done.error.is_none());
    }

    #[tokio::test]
    async fn test_terminal_job_is_immutable() {
        let store = setup_store().await;
        store.create(&job("job-1", 1_000)).await.unwrap();
        store.claim_next(2_000).await.unwrap();
        store
            .update("job-1", &JobPatch::fail("probe fleet down", 3_000))
            .await
            .unwrap();

        assert!(matches!(
            store.update("job-1", &JobPatch::progress(50)).await,
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(
            store.update("job-1", &JobPatch::complete(result(), 4_000)).await,
            Err(AppError::InvalidState(_))
        ));

        let failed = store.get("job-1", "key-a").await.unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.progress, 10);
        assert_eq!(failed.error.as_deref(), Some("probe fleet down"));
    }

    #[tokio::test]
    async fn test_queued_cannot_complete() {
        let store = setup_store().await;
        store.create(&job("job-1", 1_000)).await.unwrap();

        assert!(matches!(
            store.update("job-1", &JobPatch::complete(result(), 2_000)).await,
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(
            store.update("missing", &JobPatch::progress(20)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_patch_is_rejected() {
        let store = setup_store().await;
        store.create(&job("job-1", 1_000)).await.unwrap();
        store.claim_next(2_000).await.unwrap();

        let patch = JobPatch {
            status: Some(JobStatus::Complete),
            ..Default::default()
        };
        assert!(matches!(
            store.update("job-1", &patch).await,
            Err(AppError::Domain(_))
        ));
    }

    #[tokio::test]
    async fn test_list_and_count_by_status() {
        let store = setup_store().await;
        store.create(&job("job-1", 1_000)).await.unwrap();
        store.create(&job("job-2", 2_000)).await.unwrap();
        store.claim_next(3_000).await.unwrap();

        let running = store.list_running().await.unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].id, "job-1");
        assert_eq!(store.count_by_status(JobStatus::Queued).await.unwrap(), 1);
    }
}
