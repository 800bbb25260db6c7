// SQLite SnapshotStore Implementation

use crate::error::{corrupt_row, map_sqlx_error};
use async_trait::async_trait;
use signal_core::domain::Snapshot;
use signal_core::error::Result;
use signal_core::port::SnapshotStore;
use sqlx::SqlitePool;

pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn record(&self, snapshot: &Snapshot) -> Result<Option<Snapshot>> {
        let profile_json = serde_json::to_string(&snapshot.profile)?;
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // INSERT first so the write lock is held before the predecessor is read
        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO snapshots (owner_key, target_url, profile_json, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING seq
            "#,
        )
        .bind(&snapshot.owner_key)
        .bind(&snapshot.target_url)
        .bind(&profile_json)
        .bind(snapshot.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let previous = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT * FROM snapshots
            WHERE owner_key = ? AND target_url = ? AND seq < ?
            ORDER BY seq DESC
            LIMIT 1
            "#,
        )
        .bind(&snapshot.owner_key)
        .bind(&snapshot.target_url)
        .bind(seq)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        previous.map(SnapshotRow::into_snapshot).transpose()
    }

    async fn latest(&self, owner_key: &str, target_url: &str) -> Result<Option<Snapshot>> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT * FROM snapshots
            WHERE owner_key = ? AND target_url = ?
            ORDER BY seq DESC
            LIMIT 1
            "#,
        )
        .bind(owner_key)
        .bind(target_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(SnapshotRow::into_snapshot).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SnapshotRow {
    seq: i64,
    owner_key: String,
    target_url: String,
    profile_json: String,
    created_at: i64,
}

impl SnapshotRow {
    fn into_snapshot(self) -> Result<Snapshot> {
        let profile = serde_json::from_str(&self.profile_json)
            .map_err(|e| corrupt_row("snapshots", &self.seq.to_string(), e))?;
        Ok(Snapshot {
            owner_key: self.owner_key,
            target_url: self.target_url,
            profile,
            created_at: self.created_at,
        })
    }
}
