//! Signal Analyst - Main Entry Point
//! JSON-RPC server + analysis worker + maintenance scheduler over one SQLite file

mod settings;

use anyhow::{Context, Result};
use settings::Settings;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use signal_api_rpc::{RpcHandler, RpcServer};
use signal_core::application::{
    shutdown_channel, AdmissionGate, AnalysisService, CohortService, MaintenanceScheduler,
    Orchestrator, RecoveryService, Worker,
};
use signal_core::port::id_provider::UuidProvider;
use signal_core::port::llm_client::DisabledLlmClient;
use signal_core::port::time_provider::SystemTimeProvider;
use signal_core::port::{JobStore, LlmClient, PeerDiscovery, TimeProvider};
use signal_infra_http::{
    build_probes, HttpPeerDiscovery, OllamaClient, UnconfiguredDiscovery,
};
use signal_infra_sqlite::{
    create_pool, run_migrations, SqliteAdmissionStore, SqliteCohortStore, SqliteJobStore,
    SqliteMaintenance, SqliteSnapshotStore,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Stdout logging (pretty or JSON via `SIGNAL_LOG_FORMAT`), plus a daily rolling JSON
/// file when `SIGNAL_LOG_DIR` is set. The returned guard flushes the file writer on drop.
fn init_tracing() -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("signal=info"))
        .context("Failed to create env filter")?;

    let log_format = std::env::var("SIGNAL_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let stdout_layer = match log_format.as_str() {
        "json" => fmt::layer().json().boxed(),
        _ => fmt::layer().pretty().boxed(),
    };

    let mut guard = None;
    let file_layer = std::env::var("SIGNAL_LOG_DIR").ok().map(|dir| {
        let dir = shellexpand::tilde(&dir).into_owned();
        let appender = tracing_appender::rolling::daily(dir, "signal-analyst.log");
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);
        fmt::layer().json().with_ansi(false).with_writer(writer)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Fail jobs left RUNNING by a previous process. The daemon does not serve
/// until this succeeds.
async fn recover_jobs(jobs: Arc<dyn JobStore>, time: Arc<dyn TimeProvider>) -> Result<()> {
    info!("Running crash recovery...");
    let report = RecoveryService::new(jobs, time)
        .recover()
        .await
        .map_err(|e| anyhow::anyhow!("Crash recovery failed: {}", e))?;
    info!(
        failed_jobs = report.failed.len(),
        queued_jobs = report.queued,
        "Crash recovery completed"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = init_tracing()?;
    info!("Signal Analyst v{} starting...", VERSION);

    // 1. Configuration
    let settings = Settings::load()?;

    // 2. Database
    let db_url = settings.database.url();
    if let Some(path) = db_url.strip_prefix("sqlite://") {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    info!(db_url = %db_url, "Initializing database...");
    let pool = create_pool(&db_url)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 3. Adapters
    let time = Arc::new(SystemTimeProvider);
    let ids = Arc::new(UuidProvider);
    let jobs = Arc::new(SqliteJobStore::new(pool.clone()));
    let snapshots = Arc::new(SqliteSnapshotStore::new(pool.clone()));
    let cohorts = Arc::new(SqliteCohortStore::new(pool.clone()));
    let admission = Arc::new(SqliteAdmissionStore::new(pool.clone()));
    let maintenance = Arc::new(SqliteMaintenance::new(pool.clone(), time.clone()));

    let probes = build_probes(&settings.probes)
        .map_err(|e| anyhow::anyhow!("Probe setup failed: {}", e))?;
    if probes.is_empty() {
        warn!("No probe endpoints configured: every section will be reported as a limitation");
    }

    let llm: Arc<dyn LlmClient> = match settings.llm.base_url {
        Some(_) => Arc::new(
            OllamaClient::new(&settings.llm)
                .map_err(|e| anyhow::anyhow!("LLM client setup failed: {}", e))?,
        ),
        None => {
            info!("llm.base_url not set: reports use the deterministic fallback");
            Arc::new(DisabledLlmClient)
        }
    };

    let discovery: Arc<dyn PeerDiscovery> = match settings.discovery.endpoint.as_deref() {
        Some(endpoint) => Arc::new(
            HttpPeerDiscovery::new(
                endpoint,
                Duration::from_millis(settings.discovery.request_timeout_ms),
            )
            .map_err(|e| anyhow::anyhow!("Discovery client setup failed: {}", e))?,
        ),
        None => Arc::new(UnconfiguredDiscovery),
    };

    // 4. Crash recovery
    recover_jobs(jobs.clone(), time.clone()).await?;

    // 5. Services
    let wakeup = Arc::new(Notify::new());
    let gate = Arc::new(AdmissionGate::new(settings.gate.clone(), admission, time.clone()));
    let analysis = Arc::new(AnalysisService::new(
        jobs.clone(),
        gate.clone(),
        ids.clone(),
        time.clone(),
        wakeup.clone(),
    ));
    let cohort_service = Arc::new(CohortService::new(
        cohorts,
        jobs.clone(),
        discovery,
        analysis.clone(),
        gate.clone(),
        ids,
        time.clone(),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        jobs.clone(),
        snapshots,
        probes,
        llm,
        time.clone(),
        settings.orchestrator.clone(),
    ));

    // 6. Worker and maintenance
    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    info!(
        max_concurrent_jobs = settings.orchestrator.max_concurrent_jobs,
        "Starting worker..."
    );
    let worker = Worker::new(jobs.clone(), orchestrator, time.clone(), wakeup);
    let worker_handle = tokio::spawn(async move {
        if let Err(e) = worker.run(shutdown_rx).await {
            error!(error = %e, "Worker failed");
        }
    });

    info!("Starting maintenance scheduler...");
    let scheduler = MaintenanceScheduler::new(maintenance.clone(), settings.maintenance.clone());
    tokio::spawn(scheduler.run(shutdown_tx.subscribe()));

    // 7. JSON-RPC server
    let handler = RpcHandler::new(analysis, cohort_service, gate, jobs, maintenance);
    let (addr, rpc_handle) = RpcServer::new(settings.rpc.clone(), handler)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(addr = %addr, "System ready. Press Ctrl+C to shutdown");

    // 8. Shutdown
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    shutdown_tx.shutdown();
    if let Err(e) = rpc_handle.stop() {
        warn!(error = %e, "RPC server was already stopped");
    }
    if tokio::time::timeout(SHUTDOWN_GRACE, worker_handle).await.is_err() {
        warn!("Worker did not drain within the grace period; running jobs are failed on next start");
    }
    pool.close().await;

    info!("Shutdown complete.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_core::domain::{Job, JobStatus, ReportStyle, Target};
    use signal_core::port::job_store::mocks::InMemoryJobStore;
    use signal_core::port::time_provider::mocks::MockTimeProvider;

    async fn store_with_running_job() -> Arc<InMemoryJobStore> {
        let jobs = Arc::new(InMemoryJobStore::new());
        let job = Job::new(
            "job-1",
            "key-a",
            Target::new("https://acme.io/", None),
            None,
            ReportStyle::Standard,
            1_000,
        );
        jobs.create(&job).await.unwrap();
        jobs.claim_next(2_000).await.unwrap().unwrap();
        jobs
    }

    #[tokio::test]
    async fn test_recovery_failure_stops_startup() {
        let jobs = store_with_running_job().await;
        jobs.fail_updates(true);

        let err = recover_jobs(jobs.clone(), Arc::new(MockTimeProvider::new(3_000)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Crash recovery failed"));
        assert_eq!(jobs.snapshot("job-1").unwrap().status, JobStatus::Running);
    }

    #[tokio::test]
    async fn test_recovery_fails_running_jobs() {
        let jobs = store_with_running_job().await;

        recover_jobs(jobs.clone(), Arc::new(MockTimeProvider::new(3_000)))
            .await
            .unwrap();
        assert_eq!(jobs.snapshot("job-1").unwrap().status, JobStatus::Failed);
    }
}
