// Snapshot Store Port

use crate::domain::Snapshot;
use crate::error::Result;
use async_trait::async_trait;

/// Append-only profile history per (owner key, target url)
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Append a snapshot and return the one immediately preceding it for the same
    /// owner and target, both in a single transaction
    async fn record(&self, snapshot: &Snapshot) -> Result<Option<Snapshot>>;

    /// Most recent snapshot for an owner and target
    async fn latest(&self, owner_key: &str, target_url: &str) -> Result<Option<Snapshot>>;
}

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemorySnapshotStore {
        rows: Mutex<Vec<Snapshot>>,
        fail: AtomicBool,
    }

    impl InMemorySnapshotStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_writes(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub fn len(&self) -> usize {
            self.rows.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl SnapshotStore for InMemorySnapshotStore {
        async fn record(&self, snapshot: &Snapshot) -> Result<Option<Snapshot>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::Database("simulated snapshot failure".to_string()));
            }
            let mut rows = self.rows.lock().unwrap();
            let previous = rows
                .iter()
                .rev()
                .find(|s| s.owner_key == snapshot.owner_key && s.target_url == snapshot.target_url)
                .cloned();
            rows.push(snapshot.clone());
            Ok(previous)
        }

        async fn latest(&self, owner_key: &str, target_url: &str) -> Result<Option<Snapshot>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .rev()
                .find(|s| s.owner_key == owner_key && s.target_url == target_url)
                .cloned())
        }
    }
}
