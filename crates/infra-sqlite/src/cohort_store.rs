// SQLite CohortStore Implementation

use crate::error::{corrupt_row, map_sqlx_error};
use async_trait::async_trait;
use signal_core::domain::{Cohort, CohortStatus};
use signal_core::error::{AppError, Result};
use signal_core::port::CohortStore;
use sqlx::SqlitePool;

pub struct SqliteCohortStore {
    pool: SqlitePool,
}

impl SqliteCohortStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CohortStore for SqliteCohortStore {
    async fn insert(&self, cohort: &Cohort) -> Result<()> {
        let cohort_json = serde_json::to_string(cohort)?;
        sqlx::query(
            r#"
            INSERT INTO cohorts (id, owner_key, anchor_url, status, cohort_json, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&cohort.id)
        .bind(&cohort.owner_key)
        .bind(&cohort.anchor_url)
        .bind(cohort.status.as_str())
        .bind(&cohort_json)
        .bind(cohort.created_at)
        .bind(cohort.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get(&self, id: &str, owner_key: &str) -> Result<Cohort> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT owner_key, cohort_json FROM cohorts WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        let (owner, cohort_json) =
            row.ok_or_else(|| AppError::NotFound(format!("Cohort {} not found", id)))?;
        if owner != owner_key {
            return Err(AppError::Forbidden(format!(
                "Cohort {} belongs to another key",
                id
            )));
        }
        serde_json::from_str(&cohort_json).map_err(|e| corrupt_row("cohorts", id, e))
    }

    async fn save(&self, cohort: &Cohort, expected: CohortStatus) -> Result<()> {
        let cohort_json = serde_json::to_string(cohort)?;
        let result = sqlx::query(
            r#"
            UPDATE cohorts
            SET status = ?, cohort_json = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(cohort.status.as_str())
        .bind(&cohort_json)
        .bind(cohort.updated_at)
        .bind(&cohort.id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let current: Option<String> = sqlx::query_scalar("SELECT status FROM cohorts WHERE id = ?")
            .bind(&cohort.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        match current {
            None => Err(AppError::NotFound(format!("Cohort {} not found", cohort.id))),
            Some(current) => Err(AppError::InvalidState(format!(
                "Cohort {} is {}, expected {}",
                cohort.id, current, expected
            ))),
        }
    }
}
