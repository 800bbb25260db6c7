// Transaction port for atomic admission (rate window + daily quota)

use crate::error::Result;
use async_trait::async_trait;

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Store holding per-key rate windows and quota counters
#[async_trait]
pub trait TransactionalAdmissionStore: Send + Sync {
    /// Begin a write transaction. Concurrent admissions for any key serialize here.
    async fn begin_admission(&self) -> Result<Box<dyn AdmissionTransaction>>;
}

/// Rate/quota operations within one transaction
#[async_trait]
pub trait AdmissionTransaction: Transaction {
    /// Drop hits older than `window_start` and return the remaining ones, oldest first
    async fn prune_hits(&mut self, owner_key: &str, window_start: i64) -> Result<Vec<i64>>;

    /// Record one request at `at_millis`
    async fn record_hit(&mut self, owner_key: &str, at_millis: i64) -> Result<()>;

    /// Units consumed on a UTC date
    async fn quota_used(&mut self, owner_key: &str, date: &str) -> Result<u32>;

    /// Consume units on a UTC date
    async fn consume_quota(&mut self, owner_key: &str, date: &str, units: u32) -> Result<()>;
}

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::{Mutex, OwnedMutexGuard};

    #[derive(Debug, Clone, Default)]
    pub struct AdmissionState {
        pub hits: HashMap<String, Vec<i64>>,
        pub quota: HashMap<(String, String), u32>,
    }

    /// In-memory admission store. A transaction holds the state lock until it ends,
    /// so admissions serialize like SQLite write transactions.
    #[derive(Default, Clone)]
    pub struct InMemoryAdmissionStore {
        state: Arc<Mutex<AdmissionState>>,
    }

    impl InMemoryAdmissionStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn state(&self) -> AdmissionState {
            self.state.lock().await.clone()
        }
    }

    pub struct InMemoryAdmissionTransaction {
        guard: OwnedMutexGuard<AdmissionState>,
        staged: AdmissionState,
    }

    #[async_trait]
    impl TransactionalAdmissionStore for InMemoryAdmissionStore {
        async fn begin_admission(&self) -> Result<Box<dyn AdmissionTransaction>> {
            let guard = Arc::clone(&self.state).lock_owned().await;
            let staged = guard.clone();
            Ok(Box::new(InMemoryAdmissionTransaction { guard, staged }))
        }
    }

    #[async_trait]
    impl Transaction for InMemoryAdmissionTransaction {
        async fn commit(mut self: Box<Self>) -> Result<()> {
            *self.guard = std::mem::take(&mut self.staged);
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl AdmissionTransaction for InMemoryAdmissionTransaction {
        async fn prune_hits(&mut self, owner_key: &str, window_start: i64) -> Result<Vec<i64>> {
            let hits = self.staged.hits.entry(owner_key.to_string()).or_default();
            hits.retain(|&at| at >= window_start);
            hits.sort_unstable();
            Ok(hits.clone())
        }

        async fn record_hit(&mut self, owner_key: &str, at_millis: i64) -> Result<()> {
            self.staged
                .hits
                .entry(owner_key.to_string())
                .or_default()
                .push(at_millis);
            Ok(())
        }

        async fn quota_used(&mut self, owner_key: &str, date: &str) -> Result<u32> {
            Ok(self
                .staged
                .quota
                .get(&(owner_key.to_string(), date.to_string()))
                .copied()
                .unwrap_or(0))
        }

        async fn consume_quota(&mut self, owner_key: &str, date: &str, units: u32) -> Result<()> {
            *self
                .staged
                .quota
                .entry((owner_key.to_string(), date.to_string()))
                .or_insert(0) += units;
            Ok(())
        }
    }
}
