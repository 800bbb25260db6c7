// Probe dispatch - bounded, isolated, time-limited fan-out for one job

use super::Orchestrator;
use crate::application::constants::{PROGRESS_PROBES_END, PROGRESS_PROBES_START};
use crate::application::merger::ProbeOutcome;
use crate::application::planner::ProbePlan;
use crate::domain::{Job, JobPatch, ProbeKind};
use crate::error::Result;
use crate::port::{ProbeError, ProbeInput};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

type ProbeTask = BoxFuture<'static, (ProbeKind, ProbeOutcome)>;

/// Progress after `resolved` of `total` probes, spread over 10..=90
pub(crate) fn probe_progress(resolved: usize, total: usize) -> u8 {
    if total == 0 {
        return PROGRESS_PROBES_END;
    }
    let span = (PROGRESS_PROBES_END - PROGRESS_PROBES_START) as usize;
    PROGRESS_PROBES_START + (span * resolved.min(total) / total) as u8
}

impl Orchestrator {
    /// Run every planned probe. web_scrape goes first when seo or tech_stack
    /// need its output; those start once it resolves, whatever the result.
    pub(super) async fn dispatch(
        &self,
        job: &Job,
        plan: &ProbePlan,
    ) -> Result<HashMap<ProbeKind, ProbeOutcome>> {
        let total = plan.len();
        let mut outcomes = HashMap::with_capacity(total);
        if total == 0 {
            return Ok(outcomes);
        }

        let permits = Arc::new(Semaphore::new(self.config.max_parallel_probes.max(1)));
        let input = ProbeInput::new(job.target.clone());
        let scrape_first = plan.is_enabled(ProbeKind::WebScrape);

        let mut deferred = Vec::new();
        let mut pending: FuturesUnordered<ProbeTask> = FuturesUnordered::new();
        for kind in plan.enabled() {
            if scrape_first && kind.depends_on_scrape() {
                deferred.push(kind);
            } else {
                pending.push(self.launch(kind, input.clone(), &permits));
            }
        }

        let mut resolved = 0;
        while let Some((kind, outcome)) = pending.next().await {
            resolved += 1;

            if kind == ProbeKind::WebScrape {
                let upstream = outcome.payload().cloned();
                for dependent in deferred.drain(..) {
                    let input = input.clone().with_upstream(upstream.clone());
                    pending.push(self.launch(dependent, input, &permits));
                }
            }

            match &outcome {
                ProbeOutcome::Completed(_) => {
                    debug!(job_id = %job.id, probe = %kind, "Probe completed")
                }
                ProbeOutcome::Failed(e) => {
                    warn!(job_id = %job.id, probe = %kind, error = %e, "Probe failed")
                }
            }
            outcomes.insert(kind, outcome);

            self.jobs
                .update(&job.id, &JobPatch::progress(probe_progress(resolved, total)))
                .await?;
        }

        Ok(outcomes)
    }

    /// One probe call in its own task so a panic stays inside it
    fn launch(&self, kind: ProbeKind, input: ProbeInput, permits: &Arc<Semaphore>) -> ProbeTask {
        let probe = self.probes.get(&kind).cloned();
        let permits = Arc::clone(permits);
        let timeout_ms = self.config.probe_timeout_ms;

        async move {
            let Some(probe) = probe else {
                return (kind, ProbeOutcome::Failed(ProbeError::NotConfigured(kind)));
            };
            let Ok(_permit) = permits.acquire_owned().await else {
                return (
                    kind,
                    ProbeOutcome::Failed(ProbeError::Unavailable("probe pool closed".to_string())),
                );
            };

            let handle = tokio::spawn(async move {
                tokio::time::timeout(Duration::from_millis(timeout_ms), probe.run(&input)).await
            });

            let outcome = match handle.await {
                Ok(Ok(Ok(payload))) => ProbeOutcome::Completed(payload),
                Ok(Ok(Err(e))) => ProbeOutcome::Failed(e),
                Ok(Err(_elapsed)) => ProbeOutcome::Failed(ProbeError::Timeout(timeout_ms)),
                Err(join_err) => ProbeOutcome::Failed(ProbeError::Panicked(join_err.to_string())),
            };
            (kind, outcome)
        }
        .boxed()
    }
}
