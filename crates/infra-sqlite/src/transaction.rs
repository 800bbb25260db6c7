// SQLite Admission Transaction Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use signal_core::error::Result;
use signal_core::port::{AdmissionTransaction, Transaction, TransactionalAdmissionStore};
use sqlx::{Sqlite, SqlitePool, Transaction as SqlxTransaction};

/// Rate-window hits and daily quota counters
pub struct SqliteAdmissionStore {
    pool: SqlitePool,
}

impl SqliteAdmissionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionalAdmissionStore for SqliteAdmissionStore {
    async fn begin_admission(&self) -> Result<Box<dyn AdmissionTransaction>> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(SqliteAdmissionTransaction::new(tx)))
    }
}

/// One admission check. The gate always calls `prune_hits` first; that DELETE takes the
/// database write lock, so concurrent admissions queue on busy_timeout instead of
/// reading stale counters.
pub struct SqliteAdmissionTransaction {
    tx: SqlxTransaction<'static, Sqlite>,
}

impl SqliteAdmissionTransaction {
    pub fn new(tx: SqlxTransaction<'static, Sqlite>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Transaction for SqliteAdmissionTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }
}

#[async_trait]
impl AdmissionTransaction for SqliteAdmissionTransaction {
    async fn prune_hits(&mut self, owner_key: &str, window_start: i64) -> Result<Vec<i64>> {
        sqlx::query("DELETE FROM rate_hits WHERE owner_key = ? AND at_millis < ?")
            .bind(owner_key)
            .bind(window_start)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query_scalar(
            "SELECT at_millis FROM rate_hits WHERE owner_key = ? ORDER BY at_millis ASC",
        )
        .bind(owner_key)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)
    }

    async fn record_hit(&mut self, owner_key: &str, at_millis: i64) -> Result<()> {
        sqlx::query("INSERT INTO rate_hits (owner_key, at_millis) VALUES (?, ?)")
            .bind(owner_key)
            .bind(at_millis)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn quota_used(&mut self, owner_key: &str, date: &str) -> Result<u32> {
        let used: Option<i64> =
            sqlx::query_scalar("SELECT used FROM quota_usage WHERE owner_key = ? AND day = ?")
                .bind(owner_key)
                .bind(date)
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(map_sqlx_error)?;

        Ok(used.map_or(0, |u| u.clamp(0, u32::MAX as i64) as u32))
    }

    async fn consume_quota(&mut self, owner_key: &str, date: &str, units: u32) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO quota_usage (owner_key, day, used) VALUES (?, ?, ?)
            ON CONFLICT (owner_key, day) DO UPDATE SET used = used + excluded.used
            "#,
        )
        .bind(owner_key)
        .bind(date)
        .bind(units as i64)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};

    async fn setup_store() -> SqliteAdmissionStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteAdmissionStore::new(pool)
    }

    #[tokio::test]
    async fn test_prune_drops_hits_outside_window() {
        let store = setup_store().await;
        let mut tx = store.begin_admission().await.unwrap();
        for at in [1_000, 2_000, 3_000] {
            tx.record_hit("key-a", at).await.unwrap();
        }
        tx.record_hit("key-b", 500).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin_admission().await.unwrap();
        assert_eq!(tx.prune_hits("key-a", 2_000).await.unwrap(), vec![2_000, 3_000]);
        assert_eq!(tx.prune_hits("key-b", 0).await.unwrap(), vec![500]);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_quota_accumulates_per_day() {
        let store = setup_store().await;
        let mut tx = store.begin_admission().await.unwrap();
        tx.consume_quota("key-a", "2024-01-01", 3).await.unwrap();
        tx.consume_quota("key-a", "2024-01-01", 2).await.unwrap();
        tx.consume_quota("key-a", "2024-01-02", 1).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin_admission().await.unwrap();
        assert_eq!(tx.quota_used("key-a", "2024-01-01").await.unwrap(), 5);
        assert_eq!(tx.quota_used("key-a", "2024-01-02").await.unwrap(), 1);
        assert_eq!(tx.quota_used("key-b", "2024-01-01").await.unwrap(), 0);
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_rollback_discards_changes() {
        let store = setup_store().await;
        let mut tx = store.begin_admission().await.unwrap();
        tx.record_hit("key-a", 1_000).await.unwrap();
        tx.consume_quota("key-a", "2024-01-01", 1).await.unwrap();
        tx.rollback().await.unwrap();

        let mut tx = store.begin_admission().await.unwrap();
        assert!(tx.prune_hits("key-a", 0).await.unwrap().is_empty());
        assert_eq!(tx.quota_used("key-a", "2024-01-01").await.unwrap(), 0);
        tx.rollback().await.unwrap();
    }
}
