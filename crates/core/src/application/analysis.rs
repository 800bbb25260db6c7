// Analysis Service - submit and poll single-target analysis jobs

use crate::application::gate::AdmissionGate;
use crate::application::validator::validate_target;
use crate::domain::{Job, JobId, ReportStyle, Target};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, JobStore, TimeProvider};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

/// Longest accepted focus text
const MAX_FOCUS_CHARS: usize = 1_000;

#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    pub url: String,
    pub name: Option<String>,
    pub focus: Option<String>,
    /// Explicit style; inferred from the focus when absent
    pub style: Option<String>,
}

impl SubmitRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

pub struct AnalysisService {
    jobs: Arc<dyn JobStore>,
    gate: Arc<AdmissionGate>,
    ids: Arc<dyn IdProvider>,
    time: Arc<dyn TimeProvider>,
    wakeup: Arc<Notify>,
}

impl AnalysisService {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        gate: Arc<AdmissionGate>,
        ids: Arc<dyn IdProvider>,
        time: Arc<dyn TimeProvider>,
        wakeup: Arc<Notify>,
    ) -> Self {
        Self {
            jobs,
            gate,
            ids,
            time,
            wakeup,
        }
    }

    /// Validate, admit, then persist a QUEUED job for the worker.
    /// Validation runs first so a bad request never consumes rate or quota.
    pub async fn submit(&self, api_key: &str, request: SubmitRequest) -> Result<Job> {
        let url = validate_target(&request.url)?;
        let focus = normalize_focus(request.focus)?;
        let style = resolve_style(request.style.as_deref(), focus.as_deref())?;

        self.gate.admit(api_key).await?;

        let job = self.new_job(api_key, Target::new(url, request.name), focus, style);
        self.jobs.create(&job).await?;
        info!(job_id = %job.id, target = %job.target.url, style = %style, "Job submitted");

        self.wakeup.notify_one();
        Ok(job)
    }

    /// Submit several targets under one admission consuming one quota unit each.
    /// All targets are validated before anything is admitted.
    pub async fn submit_batch(
        &self,
        api_key: &str,
        urls: &[String],
        focus: Option<String>,
    ) -> Result<Vec<JobId>> {
        if urls.is_empty() {
            return Err(AppError::Validation("batch has no targets".to_string()));
        }
        let urls = urls
            .iter()
            .map(|u| validate_target(u))
            .collect::<Result<Vec<_>>>()?;
        let focus = normalize_focus(focus)?;
        let style = ReportStyle::infer_from_focus(focus.as_deref());

        self.gate.admit_batch(api_key, urls.len() as u32).await?;

        let mut ids = Vec::with_capacity(urls.len());
        for url in urls {
            let job = self.new_job(api_key, Target::new(url, None), focus.clone(), style);
            self.jobs.create(&job).await?;
            ids.push(job.id);
        }
        info!(jobs = ids.len(), "Batch submitted");

        self.wakeup.notify_one();
        Ok(ids)
    }

    /// Current state of a job owned by `api_key`
    pub async fn poll(&self, api_key: &str, job_id: &str) -> Result<Job> {
        self.gate.authenticate(api_key)?;
        self.jobs.get(job_id, api_key).await
    }

    fn new_job(
        &self,
        api_key: &str,
        target: Target,
        focus: Option<String>,
        style: ReportStyle,
    ) -> Job {
        Job::new(
            self.ids.generate_id(),
            api_key,
            target,
            focus,
            style,
            self.time.now_millis(),
        )
    }
}

fn normalize_focus(focus: Option<String>) -> Result<Option<String>> {
    let focus = focus
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());
    if focus.as_ref().is_some_and(|f| f.chars().count() > MAX_FOCUS_CHARS) {
        return Err(AppError::Validation(format!(
            "focus exceeds {} characters",
            MAX_FOCUS_CHARS
        )));
    }
    Ok(focus)
}

fn resolve_style(explicit: Option<&str>, focus: Option<&str>) -> Result<ReportStyle> {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(style) => style
            .parse()
            .map_err(|e: crate::domain::DomainError| AppError::Validation(e.to_string())),
        None => Ok(ReportStyle::infer_from_focus(focus)),
    }
}
