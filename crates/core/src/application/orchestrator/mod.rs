// Job Orchestrator - runs one claimed job end to end
//
// plan -> dispatch probes -> merge -> snapshot + delta -> synthesize -> complete.
// Every failure past the claim lands the job in FAILED; nothing is left RUNNING.

mod dispatch;

use crate::application::constants::{
    DEFAULT_MAX_CONCURRENT_JOBS, DEFAULT_MAX_PARALLEL_PROBES, DEFAULT_PROBE_TIMEOUT_MS,
    DEFAULT_SYNTHESIS_TIMEOUT_MS, PROGRESS_DELTA_DONE,
};
use crate::application::delta::{compute_delta, default_tracked_fields};
use crate::application::merger::merge;
use crate::application::planner::Planner;
use crate::application::synthesis::Synthesizer;
use crate::domain::{Job, JobPatch, JobResult, ProbeKind, Snapshot};
use crate::error::Result;
use crate::port::{JobStore, LlmClient, Probe, SnapshotStore, TimeProvider};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Probes running at once within one job
    pub max_parallel_probes: usize,
    /// Jobs running at once across the daemon
    pub max_concurrent_jobs: usize,
    pub probe_timeout_ms: u64,
    pub synthesis_timeout_ms: u64,
    /// Probes that never run, whatever the focus says
    pub disabled_probes: Vec<ProbeKind>,
    /// `section.field` paths compared between snapshots
    pub tracked_fields: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_parallel_probes: DEFAULT_MAX_PARALLEL_PROBES,
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            synthesis_timeout_ms: DEFAULT_SYNTHESIS_TIMEOUT_MS,
            disabled_probes: Vec::new(),
            tracked_fields: default_tracked_fields(),
        }
    }
}

pub struct Orchestrator {
    jobs: Arc<dyn JobStore>,
    snapshots: Arc<dyn SnapshotStore>,
    probes: HashMap<ProbeKind, Arc<dyn Probe>>,
    planner: Planner,
    synthesizer: Synthesizer,
    time: Arc<dyn TimeProvider>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        snapshots: Arc<dyn SnapshotStore>,
        probes: Vec<Arc<dyn Probe>>,
        llm: Arc<dyn LlmClient>,
        time: Arc<dyn TimeProvider>,
        config: OrchestratorConfig,
    ) -> Self {
        let probes = probes.into_iter().map(|p| (p.kind(), p)).collect();
        Self {
            jobs,
            snapshots,
            probes,
            planner: Planner::new(config.disabled_probes.iter().copied()),
            synthesizer: Synthesizer::new(
                llm,
                Duration::from_millis(config.synthesis_timeout_ms),
            ),
            time,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Drive a RUNNING job to a terminal state. Never returns an error:
    /// anything that goes wrong is recorded on the job itself.
    pub async fn run(&self, job: Job) {
        let job_id = job.id.clone();
        if let Err(e) = self.execute(job).await {
            error!(job_id = %job_id, error = %e, "Job failed");
            let now = self.time.now_millis();
            if let Err(mark_err) = self
                .jobs
                .update(&job_id, &JobPatch::fail(e.to_string(), now))
                .await
            {
                error!(
                    job_id = %job_id,
                    error = %mark_err,
                    "Could not record job failure"
                );
            }
        }
    }

    async fn execute(&self, job: Job) -> Result<()> {
        info!(
            job_id = %job.id,
            target = %job.target.url,
            style = %job.style,
            "Job started"
        );

        let plan = self.planner.plan(true, job.focus.as_deref());
        let outcomes = self.dispatch(&job, &plan).await?;
        let profile = merge(&job.target, &plan, &outcomes);

        let snapshot = Snapshot {
            owner_key: job.owner_key.clone(),
            target_url: job.target.url.clone(),
            profile: profile.clone(),
            created_at: self.time.now_millis(),
        };
        let previous = self
            .snapshots
            .latest(&snapshot.owner_key, &snapshot.target_url)
            .await?;
        let delta = previous
            .map(|prev| compute_delta(&prev, &snapshot, &self.config.tracked_fields));
        self.jobs
            .update(&job.id, &JobPatch::progress(PROGRESS_DELTA_DONE))
            .await?;

        let report = self
            .synthesizer
            .synthesize(&profile, delta.as_ref(), job.style, job.focus.as_deref())
            .await;

        let sections_present = profile.present_count();
        let has_delta = delta.is_some();
        let result = JobResult {
            profile,
            report,
            delta,
        };
        self.jobs
            .update(&job.id, &JobPatch::complete(result, self.time.now_millis()))
            .await?;
        info!(job_id = %job.id, sections_present, has_delta, "Job complete");

        // History only grows from completed jobs
        if let Err(e) = self.snapshots.record(&snapshot).await {
            error!(job_id = %job.id, error = %e, "Could not record snapshot for completed job");
        }
        Ok(())
    }
}
