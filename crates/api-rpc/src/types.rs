//! RPC Request/Response Types
//!
//! JSON-RPC method parameters and results. Responses never echo the API key.

use serde::{Deserialize, Serialize};
use signal_core::application::MemberProgress;
use signal_core::domain::{
    Cohort, CohortCandidate, CohortMatrix, CohortStatus, Job, JobResult, JobStatus, ReportStyle,
};

/// analysis.submit.v1
#[derive(Debug, Deserialize)]
pub struct SubmitParams {
    pub api_key: String,
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub style: ReportStyle,
}

/// analysis.poll.v1
#[derive(Debug, Deserialize)]
pub struct PollParams {
    pub api_key: String,
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollResponse {
    pub job_id: String,
    pub url: String,
    pub status: JobStatus,
    pub progress: u8,
    pub style: ReportStyle,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub result: Option<JobResult>,
    pub error: Option<String>,
}

impl From<Job> for PollResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            url: job.target.url,
            status: job.status,
            progress: job.progress,
            style: job.style,
            created_at: job.created_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
            result: job.result,
            error: job.error,
        }
    }
}

/// cohort.propose.v1
#[derive(Debug, Deserialize)]
pub struct ProposeParams {
    pub api_key: String,
    pub anchor_url: String,
    #[serde(default)]
    pub k: Option<usize>,
    #[serde(default)]
    pub category_hint: Option<String>,
}

/// cohort.confirm.v1
#[derive(Debug, Deserialize)]
pub struct ConfirmParams {
    pub api_key: String,
    pub cohort_id: String,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default = "default_include_anchor")]
    pub include_anchor: bool,
}

fn default_include_anchor() -> bool {
    true
}

/// cohort.analyze.v1
#[derive(Debug, Deserialize)]
pub struct AnalyzeParams {
    pub api_key: String,
    pub cohort_id: String,
    #[serde(default)]
    pub focus: Option<String>,
}

/// cohort.results.v1
#[derive(Debug, Deserialize)]
pub struct ResultsParams {
    pub api_key: String,
    pub cohort_id: String,
}

/// Result of every cohort method
#[derive(Debug, Clone, Serialize)]
pub struct CohortResponse {
    pub cohort_id: String,
    pub status: CohortStatus,
    pub anchor_url: String,
    pub category_hint: Option<String>,
    pub extracted_terms: Vec<String>,
    pub candidates: Vec<CohortCandidate>,
    pub confirmed_urls: Vec<String>,
    pub job_ids: Vec<String>,
    /// Per-job progress while analyzing
    pub members: Vec<MemberProgress>,
    pub matrix: Option<CohortMatrix>,
    pub report_md: Option<String>,
}

impl CohortResponse {
    pub fn new(cohort: Cohort, members: Vec<MemberProgress>) -> Self {
        Self {
            cohort_id: cohort.id,
            status: cohort.status,
            anchor_url: cohort.anchor_url,
            category_hint: cohort.category_hint,
            extracted_terms: cohort.extracted_terms,
            candidates: cohort.candidates,
            confirmed_urls: cohort.confirmed_urls,
            job_ids: cohort.job_ids,
            members,
            matrix: cohort.matrix,
            report_md: cohort.report_md,
        }
    }
}

impl From<Cohort> for CohortResponse {
    fn from(cohort: Cohort) -> Self {
        Self::new(cohort, Vec::new())
    }
}

/// admin.stats.v1
#[derive(Debug, Deserialize)]
pub struct StatsParams {
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub total_jobs: i64,
    pub queued_jobs: i64,
    pub running_jobs: i64,
    pub complete_jobs: i64,
    pub failed_jobs: i64,
    pub snapshot_count: i64,
    pub cohort_count: i64,
    pub db_size_mb: f64,
    pub uptime_seconds: u64,
}
