// Analysis Job Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::profile::CompanyProfile;
use crate::domain::report::{Report, ReportStyle};
use crate::domain::snapshot::Delta;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Job ID (UUID v4)
pub type JobId = String;

/// API key that submitted a job and is the only key allowed to read it
pub type OwnerKey = String;

/// Progress reported once the job enters RUNNING
pub const PROGRESS_STARTED: u8 = 10;

/// Highest progress a non-complete job may report
pub const PROGRESS_CAP: u8 = 99;

/// Progress of a complete job
pub const PROGRESS_DONE: u8 = 100;

/// Job status: queued -> running -> {complete | failed}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }

    /// Forward-only transition table. A status "transitioning" to itself is allowed
    /// for non-terminal states (progress-only updates).
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Queued, Queued)
                | (Queued, Running)
                | (Queued, Failed)
                | (Running, Running)
                | (Running, Complete)
                | (Running, Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "complete" => Ok(JobStatus::Complete),
            "failed" => Ok(JobStatus::Failed),
            other => Err(DomainError::UnknownVariant {
                kind: "job status",
                value: other.to_string(),
            }),
        }
    }
}

/// Analysis target. `url` is already validated and normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub url: String,
    pub name: Option<String>,
}

impl Target {
    pub fn new(url: impl Into<String>, name: Option<String>) -> Self {
        Self {
            url: url.into(),
            name: name.filter(|n| !n.trim().is_empty()),
        }
    }

    /// Explicit name, else the host of the URL, else the raw URL
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
            .unwrap_or_else(|| self.url.clone())
    }
}

/// Output of a completed job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub profile: CompanyProfile,
    pub report: Report,
    /// None when no earlier snapshot exists for the same owner and target
    pub delta: Option<Delta>,
}

/// Job Entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub owner_key: OwnerKey,
    pub target: Target,
    pub focus: Option<String>,
    pub style: ReportStyle,

    pub status: JobStatus,
    pub progress: u8,

    pub created_at: i64, // epoch ms
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,

    pub result: Option<JobResult>,
    pub error: Option<String>,
}

impl Job {
    /// Create a new queued job
    ///
    /// ID and creation time are injected so tests stay deterministic.
    pub fn new(
        id: impl Into<String>,
        owner_key: impl Into<String>,
        target: Target,
        focus: Option<String>,
        style: ReportStyle,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            owner_key: owner_key.into(),
            target,
            focus: focus.filter(|f| !f.trim().is_empty()),
            style,
            status: JobStatus::Queued,
            progress: 0,
            created_at,
            started_at: None,
            finished_at: None,
            result: None,
            error: None,
        }
    }

    /// Apply a patch, enforcing forward-only transitions and terminal immutability
    pub fn apply(&mut self, patch: &JobPatch) -> Result<()> {
        patch.validate()?;

        if self.status.is_terminal() {
            return Err(DomainError::TerminalJob(self.id.clone()));
        }

        let next = patch.status.unwrap_or(self.status);
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }

        self.status = next;
        if let Some(progress) = patch.progress {
            self.progress = self.progress.max(progress);
        }
        if next != JobStatus::Complete {
            self.progress = self.progress.min(PROGRESS_CAP);
        }
        if patch.started_at.is_some() {
            self.started_at = patch.started_at;
        }
        if patch.finished_at.is_some() {
            self.finished_at = patch.finished_at;
        }
        if patch.result.is_some() {
            self.result = patch.result.clone();
        }
        if patch.error.is_some() {
            self.error = patch.error.clone();
        }
        Ok(())
    }
}

/// Partial update of a job, applied atomically by the job store
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub result: Option<JobResult>,
    pub error: Option<String>,
}

impl JobPatch {
    /// queued -> running
    pub fn start(now_millis: i64) -> Self {
        Self {
            status: Some(JobStatus::Running),
            progress: Some(PROGRESS_STARTED),
            started_at: Some(now_millis),
            ..Default::default()
        }
    }

    /// Progress-only update, capped below 100
    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress.min(PROGRESS_CAP)),
            ..Default::default()
        }
    }

    /// running -> complete
    pub fn complete(result: JobResult, now_millis: i64) -> Self {
        Self {
            status: Some(JobStatus::Complete),
            progress: Some(PROGRESS_DONE),
            finished_at: Some(now_millis),
            result: Some(result),
            ..Default::default()
        }
    }

    /// {queued | running} -> failed
    pub fn fail(error: impl Into<String>, now_millis: i64) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            finished_at: Some(now_millis),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// A terminal job carries exactly one of result / error
    pub fn validate(&self) -> Result<()> {
        if self.progress.is_some_and(|p| p > PROGRESS_DONE) {
            return Err(DomainError::MalformedPatch(
                "progress must be within 0..=100".to_string(),
            ));
        }
        match self.status {
            Some(JobStatus::Complete) => {
                if self.result.is_none() || self.error.is_some() {
                    return Err(DomainError::MalformedPatch(
                        "complete requires a result and no error".to_string(),
                    ));
                }
            }
            Some(JobStatus::Failed) => {
                if self.error.is_none() || self.result.is_some() {
                    return Err(DomainError::MalformedPatch(
                        "failed requires an error and no result".to_string(),
                    ));
                }
            }
            _ => {
                if self.result.is_some() || self.error.is_some() {
                    return Err(DomainError::MalformedPatch(
                        "result and error are only set on terminal transitions".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
