// Peer Discovery Port - candidate peers for a cohort anchor

use crate::domain::CohortCandidate;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    pub anchor_url: String,
    pub category_hint: Option<String>,
    pub k: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    #[serde(default)]
    pub candidates: Vec<CohortCandidate>,
    #[serde(default)]
    pub extracted_terms: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[async_trait]
pub trait PeerDiscovery: Send + Sync {
    async fn discover(&self, request: &DiscoveryRequest) -> Result<DiscoveryResult>;
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    pub struct StaticPeerDiscovery {
        result: DiscoveryResult,
        requests: Mutex<Vec<DiscoveryRequest>>,
    }

    impl StaticPeerDiscovery {
        pub fn new(result: DiscoveryResult) -> Self {
            Self {
                result,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<DiscoveryRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PeerDiscovery for StaticPeerDiscovery {
        async fn discover(&self, request: &DiscoveryRequest) -> Result<DiscoveryResult> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.result.clone())
        }
    }
}
