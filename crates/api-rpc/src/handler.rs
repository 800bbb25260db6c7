//! RPC Method Handlers
//!
//! Thin adapters from RPC params onto the application services.

use crate::error::to_rpc_error;
use crate::types::{
    AnalyzeParams, CohortResponse, ConfirmParams, PollParams, PollResponse, ProposeParams,
    ResultsParams, StatsParams, StatsResponse, SubmitParams, SubmitResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use signal_core::application::{
    AdmissionGate, AnalysisService, CohortService, ProposeRequest, SubmitRequest,
};
use signal_core::domain::JobStatus;
use signal_core::port::{JobStore, Maintenance};
use std::sync::Arc;
use std::time::Instant;

type RpcResult<T> = Result<T, ErrorObjectOwned>;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    analysis: Arc<AnalysisService>,
    cohorts: Arc<CohortService>,
    gate: Arc<AdmissionGate>,
    jobs: Arc<dyn JobStore>,
    maintenance: Arc<dyn Maintenance>,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(
        analysis: Arc<AnalysisService>,
        cohorts: Arc<CohortService>,
        gate: Arc<AdmissionGate>,
        jobs: Arc<dyn JobStore>,
        maintenance: Arc<dyn Maintenance>,
    ) -> Self {
        Self {
            analysis,
            cohorts,
            gate,
            jobs,
            maintenance,
            start_time: Instant::now(),
        }
    }

    /// analysis.submit.v1
    pub async fn submit(&self, params: SubmitParams) -> RpcResult<SubmitResponse> {
        let request = SubmitRequest {
            url: params.url,
            name: params.name,
            focus: params.focus,
            style: params.style,
        };
        let job = self
            .analysis
            .submit(&params.api_key, request)
            .await
            .map_err(to_rpc_error)?;

        Ok(SubmitResponse {
            job_id: job.id,
            status: job.status,
            style: job.style,
        })
    }

    /// analysis.poll.v1
    pub async fn poll(&self, params: PollParams) -> RpcResult<PollResponse> {
        self.analysis
            .poll(&params.api_key, &params.job_id)
            .await
            .map(PollResponse::from)
            .map_err(to_rpc_error)
    }

    /// cohort.propose.v1
    pub async fn propose(&self, params: ProposeParams) -> RpcResult<CohortResponse> {
        let request = ProposeRequest {
            anchor_url: params.anchor_url,
            k: params.k,
            category_hint: params.category_hint,
        };
        self.cohorts
            .propose(&params.api_key, request)
            .await
            .map(CohortResponse::from)
            .map_err(to_rpc_error)
    }

    /// cohort.confirm.v1
    pub async fn confirm(&self, params: ConfirmParams) -> RpcResult<CohortResponse> {
        self.cohorts
            .confirm(
                &params.api_key,
                &params.cohort_id,
                params.urls,
                params.include_anchor,
            )
            .await
            .map(CohortResponse::from)
            .map_err(to_rpc_error)
    }

    /// cohort.analyze.v1
    pub async fn analyze(&self, params: AnalyzeParams) -> RpcResult<CohortResponse> {
        self.cohorts
            .analyze(&params.api_key, &params.cohort_id, params.focus)
            .await
            .map(CohortResponse::from)
            .map_err(to_rpc_error)
    }

    /// cohort.results.v1
    pub async fn results(&self, params: ResultsParams) -> RpcResult<CohortResponse> {
        let results = self
            .cohorts
            .results(&params.api_key, &params.cohort_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(CohortResponse::new(results.cohort, results.members))
    }

    /// admin.stats.v1
    pub async fn stats(&self, params: StatsParams) -> RpcResult<StatsResponse> {
        self.gate
            .authenticate(&params.api_key)
            .map_err(to_rpc_error)?;

        let mut counts = [0i64; 4];
        let statuses = [
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Complete,
            JobStatus::Failed,
        ];
        for (count, status) in counts.iter_mut().zip(statuses) {
            *count = self
                .jobs
                .count_by_status(status)
                .await
                .map_err(to_rpc_error)?;
        }
        let stats = self.maintenance.get_stats().await.map_err(to_rpc_error)?;

        Ok(StatsResponse {
            total_jobs: stats.job_count,
            queued_jobs: counts[0],
            running_jobs: counts[1],
            complete_jobs: counts[2],
            failed_jobs: counts[3],
            snapshot_count: stats.snapshot_count,
            cohort_count: stats.cohort_count,
            db_size_mb: stats.db_size_mb,
            uptime_seconds: self.start_time.elapsed().as_secs(),
        })
    }
}
