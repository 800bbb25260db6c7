//! Admission under contention on a file-backed pool

mod common;

use common::*;
use signal_core::application::{CohortService, ProposeRequest, SubmitRequest};
use signal_core::domain::{CohortStatus, JobStatus};
use signal_core::port::id_provider::UuidProvider;
use signal_core::port::peer_discovery::mocks::StaticPeerDiscovery;
use signal_core::port::DiscoveryResult;
use signal_core::AppError;
use signal_infra_sqlite::SqliteCohortStore;
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submits_respect_rate_window() {
    let db = TempDb::new("admission");
    let h = Arc::new(Harness::connect(&db.url(), gate_config(5, 100)).await);

    let mut handles = Vec::new();
    for i in 0..20 {
        let h = h.clone();
        handles.push(tokio::spawn(async move {
            h.analysis
                .submit(KEY_A, SubmitRequest::new(format!("https://acme{}.io/", i)))
                .await
        }));
    }

    let mut admitted = 0;
    let mut limited = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(AppError::RateLimited { .. }) => limited += 1,
            Err(e) => panic!("unexpected error under contention: {:?}", e),
        }
    }

    assert_eq!(admitted, 5);
    assert_eq!(limited, 15);
    assert_eq!(h.count(JobStatus::Queued).await, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submits_never_overdraw_quota() {
    let db = TempDb::new("quota");
    let h = Arc::new(Harness::connect(&db.url(), gate_config(100, 3)).await);

    let mut handles = Vec::new();
    for _ in 0..12 {
        let h = h.clone();
        handles.push(tokio::spawn(async move {
            h.analysis
                .submit(KEY_A, SubmitRequest::new("https://acme.io/"))
                .await
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(AppError::QuotaExceeded { remaining, .. }) => assert_eq!(remaining, 0),
            Err(e) => panic!("unexpected error under contention: {:?}", e),
        }
    }
    assert_eq!(admitted, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claims_hand_out_each_job_once() {
    let db = TempDb::new("claims");
    let h = Arc::new(Harness::connect(&db.url(), gate_config(100, 100)).await);

    for i in 0..10 {
        h.analysis
            .submit(KEY_A, SubmitRequest::new(format!("https://acme{}.io/", i)))
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..16 {
        let h = h.clone();
        handles.push(tokio::spawn(async move {
            use signal_core::port::{JobStore, TimeProvider};
            h.jobs.claim_next(h.time.now_millis()).await
        }));
    }

    let mut claimed = HashSet::new();
    let mut empty = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            Some(job) => {
                assert_eq!(job.status, JobStatus::Running);
                assert!(claimed.insert(job.id), "job claimed twice");
            }
            None => empty += 1,
        }
    }
    assert_eq!(claimed.len(), 10);
    assert_eq!(empty, 6);
    assert_eq!(h.count(JobStatus::Running).await, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cohort_analyze_creates_one_job_set() {
    let db = TempDb::new("cohort");
    let h = Harness::connect(&db.url(), gate_config(100, 10)).await;
    let cohorts = Arc::new(CohortService::new(
        Arc::new(SqliteCohortStore::new(h.pool.clone())),
        h.jobs.clone(),
        Arc::new(StaticPeerDiscovery::new(DiscoveryResult::default())),
        h.analysis.clone(),
        h.gate.clone(),
        Arc::new(UuidProvider),
        h.time.clone(),
    ));

    let cohort = cohorts
        .propose(
            KEY_A,
            ProposeRequest {
                anchor_url: "https://anchor.io".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let peers = vec!["https://peer-one.io".to_string(), "https://peer-two.io".to_string()];
    cohorts.confirm(KEY_A, &cohort.id, peers, true).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cohorts = cohorts.clone();
        let id = cohort.id.clone();
        handles.push(tokio::spawn(async move { cohorts.analyze(KEY_A, &id, None).await }));
    }

    let mut started = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(cohort) => started.push(cohort),
            Err(AppError::InvalidState(_)) => {}
            Err(e) => panic!("unexpected error under contention: {:?}", e),
        }
    }

    assert_eq!(started.len(), 1);
    assert_eq!(started[0].job_ids.len(), 3);
    assert_eq!(h.count(JobStatus::Queued).await, 3);

    let stored = cohorts.results(KEY_A, &cohort.id).await.unwrap();
    assert_eq!(stored.cohort.status, CohortStatus::Analyzing);
    assert_eq!(stored.cohort.job_ids, started[0].job_ids);

    // exactly three of the ten quota units were consumed
    h.gate.admit_batch(KEY_A, 7).await.unwrap();
    assert!(matches!(
        h.gate.admit(KEY_A).await,
        Err(AppError::QuotaExceeded { remaining: 0, .. })
    ));
}
