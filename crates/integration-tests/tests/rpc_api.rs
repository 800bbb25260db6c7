//! JSON-RPC surface over HTTP: named params in, typed errors out

mod common;

use common::*;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ObjectParams;
use jsonrpsee::core::ClientError;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::server::ServerHandle;
use serde_json::{json, Value};
use signal_api_rpc::error::code;
use signal_api_rpc::{RpcHandler, RpcServer, RpcServerConfig};
use signal_core::application::{CohortService, OrchestratorConfig};
use signal_core::domain::{CandidateConfidence, CohortCandidate};
use signal_core::port::id_provider::UuidProvider;
use signal_core::port::peer_discovery::mocks::StaticPeerDiscovery;
use signal_core::port::DiscoveryResult;
use signal_infra_sqlite::{SqliteCohortStore, SqliteMaintenance};
use std::sync::Arc;

struct TestServer {
    harness: Harness,
    client: HttpClient,
    handle: ServerHandle,
}

impl TestServer {
    async fn start(gate: signal_core::application::GateConfig) -> Self {
        let harness = Harness::in_memory(gate).await;
        let discovery = Arc::new(StaticPeerDiscovery::new(DiscoveryResult {
            candidates: vec![candidate("https://globex.io/"), candidate("https://initech.io/")],
            extracted_terms: vec!["analytics".to_string()],
            sources: vec!["search".to_string()],
        }));
        let cohorts = Arc::new(CohortService::new(
            Arc::new(SqliteCohortStore::new(harness.pool.clone())),
            harness.jobs.clone(),
            discovery,
            harness.analysis.clone(),
            harness.gate.clone(),
            Arc::new(UuidProvider),
            harness.time.clone(),
        ));
        let maintenance = Arc::new(SqliteMaintenance::new(harness.pool.clone(), harness.time.clone()));
        let handler = RpcHandler::new(
            harness.analysis.clone(),
            cohorts,
            harness.gate.clone(),
            harness.jobs.clone(),
            maintenance,
        );

        let config = RpcServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        let (addr, handle) = RpcServer::new(config, handler).start().await.unwrap();
        let client = HttpClientBuilder::default()
            .build(format!("http://{}", addr))
            .unwrap();

        Self {
            harness,
            client,
            handle,
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let mut object = ObjectParams::new();
        if let Value::Object(map) = params {
            for (key, value) in map {
                object.insert(&key, value).unwrap();
            }
        }
        self.client.request(method, object).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.handle.stop();
    }
}

fn candidate(url: &str) -> CohortCandidate {
    CohortCandidate {
        url: url.to_string(),
        name: String::new(),
        source: "search".to_string(),
        rationale: "same category".to_string(),
        confidence: CandidateConfidence::Medium,
    }
}

fn error_code(result: Result<Value, ClientError>) -> (i32, Option<Value>) {
    match result {
        Err(ClientError::Call(err)) => {
            let data = err.data().map(|raw| serde_json::from_str(raw.get()).unwrap());
            (err.code(), data)
        }
        other => panic!("expected a call error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_submit_poll_and_errors_over_http() {
    let server = TestServer::start(gate_config(3, 100)).await;

    let submitted = server
        .call(
            "analysis.submit.v1",
            json!({ "api_key": KEY_A, "url": "https://acme.io", "focus": "investor diligence" }),
        )
        .await
        .unwrap();
    assert_eq!(submitted["status"], "queued");
    assert_eq!(submitted["style"], "investor");
    let job_id = submitted["job_id"].as_str().unwrap().to_string();

    let polled = server
        .call("analysis.poll.v1", json!({ "api_key": KEY_A, "job_id": job_id }))
        .await
        .unwrap();
    assert_eq!(polled["status"], "queued");
    assert_eq!(polled["progress"], 0);
    assert_eq!(polled["url"], "https://acme.io/");
    assert!(polled.get("api_key").is_none());

    let (code, _) = error_code(
        server
            .call("analysis.poll.v1", json!({ "api_key": KEY_B, "job_id": job_id }))
            .await,
    );
    assert_eq!(code, code::FORBIDDEN);

    let (code, _) = error_code(
        server
            .call("analysis.submit.v1", json!({ "api_key": "bogus", "url": "https://acme.io" }))
            .await,
    );
    assert_eq!(code, code::UNAUTHORIZED);

    let (code, _) = error_code(
        server
            .call(
                "analysis.submit.v1",
                json!({ "api_key": KEY_A, "url": "http://169.254.169.254/" }),
            )
            .await,
    );
    assert_eq!(code, code::VALIDATION_ERROR);

    for url in ["https://globex.io", "https://initech.io"] {
        server
            .call("analysis.submit.v1", json!({ "api_key": KEY_A, "url": url }))
            .await
            .unwrap();
    }
    let (code, data) = error_code(
        server
            .call("analysis.submit.v1", json!({ "api_key": KEY_A, "url": "https://acme.io" }))
            .await,
    );
    assert_eq!(code, code::RATE_LIMITED);
    assert_eq!(data.unwrap()["retry_after_secs"], 60);

    let stats = server
        .call("admin.stats.v1", json!({ "api_key": KEY_A }))
        .await
        .unwrap();
    assert_eq!(stats["total_jobs"], 3);
    assert_eq!(stats["queued_jobs"], 3);
}

#[tokio::test]
async fn test_cohort_workflow_over_http() {
    let server = TestServer::start(gate_config(20, 100)).await;

    let proposed = server
        .call(
            "cohort.propose.v1",
            json!({ "api_key": KEY_A, "anchor_url": "https://acme.io", "k": 4 }),
        )
        .await
        .unwrap();
    assert_eq!(proposed["status"], "awaiting_confirmation");
    assert_eq!(proposed["candidates"].as_array().unwrap().len(), 2);
    let cohort_id = proposed["cohort_id"].as_str().unwrap().to_string();

    let (code, _) = error_code(
        server
            .call("cohort.analyze.v1", json!({ "api_key": KEY_A, "cohort_id": cohort_id }))
            .await,
    );
    assert_eq!(code, code::CONFLICT);

    let confirmed = server
        .call(
            "cohort.confirm.v1",
            json!({
                "api_key": KEY_A,
                "cohort_id": cohort_id,
                "urls": ["https://globex.io/", "https://initech.io/"]
            }),
        )
        .await
        .unwrap();
    assert_eq!(
        confirmed["confirmed_urls"],
        json!(["https://acme.io/", "https://globex.io/", "https://initech.io/"])
    );

    let analyzing = server
        .call("cohort.analyze.v1", json!({ "api_key": KEY_A, "cohort_id": cohort_id }))
        .await
        .unwrap();
    assert_eq!(analyzing["status"], "analyzing");
    assert_eq!(analyzing["job_ids"].as_array().unwrap().len(), 3);

    let pending = server
        .call("cohort.results.v1", json!({ "api_key": KEY_A, "cohort_id": cohort_id }))
        .await
        .unwrap();
    assert_eq!(pending["status"], "analyzing");
    assert_eq!(pending["members"].as_array().unwrap().len(), 3);
    assert!(pending["report_md"].is_null());

    let h = &server.harness;
    let orchestrator = h.orchestrator(site_probes(&["React"]), offline_llm(), OrchestratorConfig::default());
    for _ in 0..3 {
        h.run_next(&orchestrator, KEY_A).await;
    }

    let complete = server
        .call("cohort.results.v1", json!({ "api_key": KEY_A, "cohort_id": cohort_id }))
        .await
        .unwrap();
    assert_eq!(complete["status"], "complete");
    assert_eq!(complete["matrix"]["targets"].as_array().unwrap().len(), 3);
    assert!(complete["report_md"].as_str().unwrap().contains("_Cohort Size: 3 targets_"));

    let (code, _) = error_code(
        server
            .call("cohort.results.v1", json!({ "api_key": KEY_B, "cohort_id": cohort_id }))
            .await,
    );
    assert_eq!(code, code::FORBIDDEN);
}
