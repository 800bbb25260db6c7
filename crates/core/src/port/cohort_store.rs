// Cohort Store Port

use crate::domain::{Cohort, CohortStatus};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CohortStore: Send + Sync {
    async fn insert(&self, cohort: &Cohort) -> Result<()>;

    /// `NotFound` if absent, `Forbidden` if owned by another key
    async fn get(&self, id: &str, owner_key: &str) -> Result<Cohort>;

    /// Persist a cohort only if its stored status is still `expected`.
    /// A concurrent transition yields `AppError::InvalidState`.
    async fn save(&self, cohort: &Cohort, expected: CohortStatus) -> Result<()>;
}

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryCohortStore {
        cohorts: Mutex<HashMap<String, Cohort>>,
    }

    impl InMemoryCohortStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl CohortStore for InMemoryCohortStore {
        async fn insert(&self, cohort: &Cohort) -> Result<()> {
            let mut cohorts = self.cohorts.lock().unwrap();
            if cohorts.contains_key(&cohort.id) {
                return Err(AppError::Conflict(format!("Cohort {} already exists", cohort.id)));
            }
            cohorts.insert(cohort.id.clone(), cohort.clone());
            Ok(())
        }

        async fn get(&self, id: &str, owner_key: &str) -> Result<Cohort> {
            let cohorts = self.cohorts.lock().unwrap();
            let cohort = cohorts
                .get(id)
                .ok_or_else(|| AppError::NotFound(format!("Cohort {} not found", id)))?;
            if cohort.owner_key != owner_key {
                return Err(AppError::Forbidden(format!(
                    "Cohort {} belongs to another key",
                    id
                )));
            }
            Ok(cohort.clone())
        }

        async fn save(&self, cohort: &Cohort, expected: CohortStatus) -> Result<()> {
            let mut cohorts = self.cohorts.lock().unwrap();
            let stored = cohorts
                .get_mut(&cohort.id)
                .ok_or_else(|| AppError::NotFound(format!("Cohort {} not found", cohort.id)))?;
            if stored.status != expected {
                return Err(AppError::InvalidState(format!(
                    "Cohort {} is {}, expected {}",
                    cohort.id, stored.status, expected
                )));
            }
            *stored = cohort.clone();
            Ok(())
        }
    }
}
