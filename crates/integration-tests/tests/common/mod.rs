//! Shared wiring: real SQLite stores, scripted probes, mock clock

#![allow(dead_code)]

use serde_json::json;
use signal_core::application::{
    AdmissionGate, AnalysisService, GateConfig, Orchestrator, OrchestratorConfig,
};
use signal_core::domain::{Job, JobStatus, ProbeKind};
use signal_core::port::id_provider::UuidProvider;
use signal_core::port::llm_client::mocks::MockLlmClient;
use signal_core::port::probe::mocks::ScriptedProbe;
use signal_core::port::time_provider::mocks::MockTimeProvider;
use signal_core::port::{JobStore, LlmClient, Probe, SynthesisError, TimeProvider};
use signal_infra_sqlite::{
    create_pool, run_migrations, SqliteAdmissionStore, SqliteJobStore, SqliteSnapshotStore,
};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;

pub const NOW: i64 = 1_704_110_400_000; // 2024-01-01T12:00:00Z
pub const KEY_A: &str = "key-a";
pub const KEY_B: &str = "key-b";

pub fn gate_config(requests_per_window: u32, daily_quota: u32) -> GateConfig {
    GateConfig {
        api_keys: vec![KEY_A.to_string(), KEY_B.to_string()],
        requests_per_window,
        window_secs: 60,
        daily_quota,
    }
}

pub struct Harness {
    pub pool: SqlitePool,
    pub jobs: Arc<SqliteJobStore>,
    pub snapshots: Arc<SqliteSnapshotStore>,
    pub gate: Arc<AdmissionGate>,
    pub analysis: Arc<AnalysisService>,
    pub time: Arc<MockTimeProvider>,
    pub wakeup: Arc<Notify>,
}

impl Harness {
    pub async fn in_memory(gate: GateConfig) -> Self {
        Self::connect("sqlite::memory:", gate).await
    }

    pub async fn connect(url: &str, gate: GateConfig) -> Self {
        let pool = create_pool(url).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let time = Arc::new(MockTimeProvider::new(NOW));
        let jobs = Arc::new(SqliteJobStore::new(pool.clone()));
        let snapshots = Arc::new(SqliteSnapshotStore::new(pool.clone()));
        let gate = Arc::new(AdmissionGate::new(
            gate,
            Arc::new(SqliteAdmissionStore::new(pool.clone())),
            time.clone(),
        ));
        let wakeup = Arc::new(Notify::new());
        let analysis = Arc::new(AnalysisService::new(
            jobs.clone(),
            gate.clone(),
            Arc::new(UuidProvider),
            time.clone(),
            wakeup.clone(),
        ));

        Self {
            pool,
            jobs,
            snapshots,
            gate,
            analysis,
            time,
            wakeup,
        }
    }

    pub fn orchestrator(
        &self,
        probes: Vec<Arc<dyn Probe>>,
        llm: Arc<dyn LlmClient>,
        config: OrchestratorConfig,
    ) -> Orchestrator {
        Orchestrator::new(
            self.jobs.clone(),
            self.snapshots.clone(),
            probes,
            llm,
            self.time.clone(),
            config,
        )
    }

    /// Claim the next queued job and drive it to a terminal state, as the worker does
    pub async fn run_next(&self, orchestrator: &Orchestrator, owner: &str) -> Job {
        let job = self
            .jobs
            .claim_next(self.time.now_millis())
            .await
            .unwrap()
            .expect("a queued job");
        let id = job.id.clone();
        orchestrator.run(job).await;
        let done = self.jobs.get(&id, owner).await.unwrap();
        assert!(done.status.is_terminal(), "job left {}", done.status);
        done
    }

    pub async fn count(&self, status: JobStatus) -> i64 {
        self.jobs.count_by_status(status).await.unwrap()
    }
}

pub fn offline_llm() -> Arc<dyn LlmClient> {
    Arc::new(MockLlmClient::failing(SynthesisError::Provider(
        "connection refused".to_string(),
    )))
}

/// Web, SEO and tech collectors answering with fixed payloads
pub fn site_probes(frameworks: &[&str]) -> Vec<Arc<dyn Probe>> {
    vec![
        Arc::new(ScriptedProbe::returning(
            ProbeKind::WebScrape,
            json!({
                "clean_text": "Acme builds pricing software. See our docs.",
                "meta": { "title": "Acme", "description": "Pricing software" }
            }),
        )),
        Arc::new(ScriptedProbe::returning(
            ProbeKind::SeoProbe,
            json!({ "meta_issues": ["missing canonical"], "heading_issues": [] }),
        )),
        Arc::new(ScriptedProbe::returning(
            ProbeKind::TechStack,
            json!({ "frameworks": frameworks, "cms": "WordPress" }),
        )),
    ]
}

/// Unique SQLite file under the temp dir, removed on drop
pub struct TempDb {
    pub path: PathBuf,
}

impl TempDb {
    pub fn new(label: &str) -> Self {
        let path = std::env::temp_dir().join(format!("signal-{}-{}.db", label, uuid::Uuid::new_v4()));
        Self { path }
    }

    pub fn url(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.path.display(), suffix));
        }
    }
}
