// Cohort Service - propose, confirm, analyze and compare a peer set

pub mod matrix;
pub mod report;

use crate::application::analysis::AnalysisService;
use crate::application::constants::{
    COHORT_DEFAULT_K, COHORT_MAX_CONFIRMED, COHORT_MAX_K, COHORT_MIN_K, COHORT_RATIONALE_MAX_CHARS,
};
use crate::application::gate::AdmissionGate;
use crate::application::validator::validate_target;
use crate::domain::{Cohort, CohortCandidate, CohortStatus, Job, JobId, JobStatus};
use crate::error::{AppError, Result};
use crate::port::{CohortStore, DiscoveryRequest, IdProvider, JobStore, PeerDiscovery, TimeProvider};
use matrix::domain_of;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct ProposeRequest {
    pub anchor_url: String,
    pub k: Option<usize>,
    pub category_hint: Option<String>,
}

/// Progress of one cohort member job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberProgress {
    pub job_id: JobId,
    pub url: String,
    pub status: JobStatus,
    pub progress: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct CohortResults {
    pub cohort: Cohort,
    /// Per-job progress while analyzing; empty otherwise
    pub members: Vec<MemberProgress>,
}

pub struct CohortService {
    cohorts: Arc<dyn CohortStore>,
    jobs: Arc<dyn JobStore>,
    discovery: Arc<dyn PeerDiscovery>,
    analysis: Arc<AnalysisService>,
    gate: Arc<AdmissionGate>,
    ids: Arc<dyn IdProvider>,
    time: Arc<dyn TimeProvider>,
}

impl CohortService {
    pub fn new(
        cohorts: Arc<dyn CohortStore>,
        jobs: Arc<dyn JobStore>,
        discovery: Arc<dyn PeerDiscovery>,
        analysis: Arc<AnalysisService>,
        gate: Arc<AdmissionGate>,
        ids: Arc<dyn IdProvider>,
        time: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            cohorts,
            jobs,
            discovery,
            analysis,
            gate,
            ids,
            time,
        }
    }

    /// Discover up to k peers for an anchor and store them awaiting confirmation
    pub async fn propose(&self, api_key: &str, request: ProposeRequest) -> Result<Cohort> {
        self.gate.authenticate(api_key)?;
        let anchor = validate_target(&request.anchor_url)?;
        let k = request.k.unwrap_or(COHORT_DEFAULT_K);
        if !(COHORT_MIN_K..=COHORT_MAX_K).contains(&k) {
            return Err(AppError::Validation(format!(
                "k must be between {} and {}",
                COHORT_MIN_K, COHORT_MAX_K
            )));
        }
        let category_hint = request
            .category_hint
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .or_else(|| hint_from_host(&anchor));

        let found = self
            .discovery
            .discover(&DiscoveryRequest {
                anchor_url: anchor.clone(),
                category_hint: category_hint.clone(),
                k,
            })
            .await?;
        let candidates = sanitize_candidates(&anchor, found.candidates, k);

        let cohort = Cohort::propose(
            self.ids.generate_id(),
            api_key,
            anchor,
            category_hint,
            found.extracted_terms,
            candidates,
            self.time.now_millis(),
        );
        self.cohorts.insert(&cohort).await?;
        info!(
            cohort_id = %cohort.id,
            anchor = %cohort.anchor_url,
            candidates = cohort.candidates.len(),
            "Cohort proposed"
        );
        Ok(cohort)
    }

    /// Fix the member list. Any public URL is accepted, not only proposed candidates.
    pub async fn confirm(
        &self,
        api_key: &str,
        cohort_id: &str,
        urls: Vec<String>,
        include_anchor: bool,
    ) -> Result<Cohort> {
        self.gate.authenticate(api_key)?;
        if urls.len() > COHORT_MAX_CONFIRMED {
            return Err(AppError::Validation(format!(
                "at most {} urls can be confirmed",
                COHORT_MAX_CONFIRMED
            )));
        }
        let urls = urls
            .iter()
            .map(|u| validate_target(u))
            .collect::<Result<Vec<_>>>()?;

        let mut cohort = self.cohorts.get(cohort_id, api_key).await?;
        cohort.confirm(urls, include_anchor, self.time.now_millis())?;
        self.cohorts
            .save(&cohort, CohortStatus::AwaitingConfirmation)
            .await?;
        info!(
            cohort_id = %cohort.id,
            members = cohort.confirmed_urls.len(),
            "Cohort confirmed"
        );
        Ok(cohort)
    }

    /// One job per confirmed URL, admitted as a single batch
    pub async fn analyze(
        &self,
        api_key: &str,
        cohort_id: &str,
        focus: Option<String>,
    ) -> Result<Cohort> {
        self.gate.authenticate(api_key)?;
        let mut cohort = self.cohorts.get(cohort_id, api_key).await?;
        if cohort.status != CohortStatus::Confirmed {
            return Err(AppError::InvalidState(format!(
                "Cohort {} is {}, expected confirmed",
                cohort.id, cohort.status
            )));
        }

        // Claim before admission so a concurrent analyze cannot create a second job set
        let confirmed = cohort.clone();
        cohort.claim_analysis(self.time.now_millis())?;
        self.cohorts.save(&cohort, CohortStatus::Confirmed).await?;

        let job_ids = match self
            .analysis
            .submit_batch(api_key, &cohort.confirmed_urls, focus)
            .await
        {
            Ok(job_ids) => job_ids,
            Err(e) => {
                if let Err(release) = self.cohorts.save(&confirmed, CohortStatus::Analyzing).await {
                    warn!(cohort_id = %cohort.id, error = %release, "Failed to release cohort claim");
                }
                return Err(e);
            }
        };
        cohort.attach_jobs(job_ids, self.time.now_millis())?;
        self.cohorts.save(&cohort, CohortStatus::Analyzing).await?;
        info!(
            cohort_id = %cohort.id,
            jobs = cohort.job_ids.len(),
            "Cohort analysis started"
        );
        Ok(cohort)
    }

    /// Progress while analyzing; builds and stores the matrix once every job is terminal
    pub async fn results(&self, api_key: &str, cohort_id: &str) -> Result<CohortResults> {
        self.gate.authenticate(api_key)?;
        let mut cohort = self.cohorts.get(cohort_id, api_key).await?;
        if cohort.status != CohortStatus::Analyzing || cohort.is_claimed() {
            return Ok(CohortResults {
                cohort,
                members: Vec::new(),
            });
        }

        let mut jobs: Vec<Option<Job>> = Vec::with_capacity(cohort.job_ids.len());
        for job_id in &cohort.job_ids {
            match self.jobs.get(job_id, api_key).await {
                Ok(job) => jobs.push(Some(job)),
                Err(AppError::NotFound(_)) => {
                    warn!(cohort_id = %cohort.id, job_id = %job_id, "Cohort job missing");
                    jobs.push(None);
                }
                Err(e) => return Err(e),
            }
        }

        let all_terminal = jobs
            .iter()
            .all(|j| j.as_ref().map_or(true, |j| j.status.is_terminal()));
        if !all_terminal {
            let members = cohort
                .job_ids
                .iter()
                .zip(&cohort.confirmed_urls)
                .zip(&jobs)
                .filter_map(|((id, url), job)| {
                    job.as_ref().map(|j| MemberProgress {
                        job_id: id.clone(),
                        url: url.clone(),
                        status: j.status,
                        progress: j.progress,
                    })
                })
                .collect();
            return Ok(CohortResults { cohort, members });
        }

        let rows = cohort
            .confirmed_urls
            .iter()
            .zip(&jobs)
            .map(|(url, job)| matrix::target_signals(url, job.as_ref()))
            .collect();
        let matrix = matrix::build_matrix(&cohort.anchor_url, rows);
        let report_md = report::render(&matrix, &cohort.anchor_url);
        cohort.complete(matrix, report_md, self.time.now_millis())?;

        match self.cohorts.save(&cohort, CohortStatus::Analyzing).await {
            Ok(()) => {
                info!(cohort_id = %cohort.id, "Cohort comparison complete");
            }
            // Another poll completed it first; return the stored copy
            Err(AppError::InvalidState(_)) => {
                cohort = self.cohorts.get(cohort_id, api_key).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(CohortResults {
            cohort,
            members: Vec::new(),
        })
    }
}

/// First host label without the TLD, e.g. "acme analytics" for https://acme-analytics.io
fn hint_from_host(anchor: &str) -> Option<String> {
    let host = domain_of(anchor);
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return None;
    }
    let term = labels[0].replace(|c: char| c == '-' || c == '_', " ").trim().to_string();
    (!term.is_empty() && !term.chars().all(|c| c.is_ascii_digit())).then_some(term)
}

/// Keep valid, public, distinct-domain candidates other than the anchor
fn sanitize_candidates(
    anchor: &str,
    candidates: Vec<CohortCandidate>,
    k: usize,
) -> Vec<CohortCandidate> {
    let mut seen: HashSet<String> = HashSet::from([domain_of(anchor)]);
    candidates
        .into_iter()
        .filter_map(|mut c| {
            c.url = validate_target(&c.url).ok()?;
            if !seen.insert(domain_of(&c.url)) {
                return None;
            }
            if c.name.trim().is_empty() {
                c.name = domain_of(&c.url);
            }
            c.rationale = c.rationale.chars().take(COHORT_RATIONALE_MAX_CHARS).collect();
            Some(c)
        })
        .take(k)
        .collect()
}
