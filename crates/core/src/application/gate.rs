// Admission Gate - API key check, sliding-window rate limit and daily quota
//
// The rate check and quota consumption happen inside one admission transaction,
// so two concurrent requests can never both take the last unit.

use crate::application::constants::{
    DEFAULT_DAILY_QUOTA, DEFAULT_RATE_LIMIT, DEFAULT_RATE_WINDOW_SECS,
};
use crate::error::{AppError, Result};
use crate::port::time_provider::{next_utc_midnight, utc_date};
use crate::port::{AdmissionTransaction, TimeProvider, TransactionalAdmissionStore};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub api_keys: Vec<String>,
    pub requests_per_window: u32,
    pub window_secs: u64,
    pub daily_quota: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            requests_per_window: DEFAULT_RATE_LIMIT,
            window_secs: DEFAULT_RATE_WINDOW_SECS,
            daily_quota: DEFAULT_DAILY_QUOTA,
        }
    }
}

/// Granted admission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub units: u32,
    pub quota_remaining: u32,
}

pub struct AdmissionGate {
    keys: HashSet<String>,
    config: GateConfig,
    store: Arc<dyn TransactionalAdmissionStore>,
    time: Arc<dyn TimeProvider>,
}

impl AdmissionGate {
    pub fn new(
        config: GateConfig,
        store: Arc<dyn TransactionalAdmissionStore>,
        time: Arc<dyn TimeProvider>,
    ) -> Self {
        let keys = config
            .api_keys
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            keys,
            config,
            store,
            time,
        }
    }

    /// Known key check only; consumes nothing
    pub fn authenticate(&self, api_key: &str) -> Result<()> {
        if api_key.is_empty() || !self.keys.contains(api_key) {
            return Err(AppError::Auth("unknown API key".to_string()));
        }
        Ok(())
    }

    /// Admit one request consuming one quota unit
    pub async fn admit(&self, api_key: &str) -> Result<Admission> {
        self.admit_batch(api_key, 1).await
    }

    /// Admit one request consuming `units` quota units (cohort analysis)
    pub async fn admit_batch(&self, api_key: &str, units: u32) -> Result<Admission> {
        self.authenticate(api_key)?;
        if units == 0 {
            return Err(AppError::Validation(
                "admission requires at least one unit".to_string(),
            ));
        }

        let now = self.time.now_millis();
        let mut tx = self.store.begin_admission().await?;

        match self.check_and_record(tx.as_mut(), api_key, units, now).await {
            Ok(admission) => {
                tx.commit().await?;
                debug!(
                    units = admission.units,
                    quota_remaining = admission.quota_remaining,
                    "Request admitted"
                );
                Ok(admission)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Admission rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn check_and_record(
        &self,
        tx: &mut dyn AdmissionTransaction,
        api_key: &str,
        units: u32,
        now: i64,
    ) -> Result<Admission> {
        let window_ms = (self.config.window_secs as i64).saturating_mul(1000);

        // Hits older than exactly one window no longer count
        let hits = tx.prune_hits(api_key, now - window_ms + 1).await?;
        if hits.len() as u32 >= self.config.requests_per_window {
            let oldest = hits.first().copied().unwrap_or(now);
            let wait_ms = (oldest + window_ms - now).max(0);
            let retry_after_secs = ((wait_ms + 999) / 1000).max(1) as u64;
            return Err(AppError::RateLimited { retry_after_secs });
        }

        let date = utc_date(now);
        let used = tx.quota_used(api_key, &date).await?;
        let remaining = self.config.daily_quota.saturating_sub(used);
        if units > remaining {
            return Err(AppError::QuotaExceeded {
                remaining,
                reset_at: next_utc_midnight(now),
            });
        }

        tx.record_hit(api_key, now).await?;
        tx.consume_quota(api_key, &date, units).await?;

        Ok(Admission {
            units,
            quota_remaining: remaining - units,
        })
    }
}
