// HTTP PeerDiscovery adapter

use crate::client::{build_client, error_body, excerpt, map_reqwest_error};
use async_trait::async_trait;
use serde::Deserialize;
use signal_core::error::{AppError, Result};
use signal_core::port::{DiscoveryRequest, DiscoveryResult, PeerDiscovery};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub endpoint: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            request_timeout_ms: 30_000,
        }
    }
}

pub struct HttpPeerDiscovery {
    endpoint: reqwest::Url,
    client: reqwest::Client,
}

impl HttpPeerDiscovery {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        Self::with_client(endpoint, build_client(timeout)?)
    }

    pub(crate) fn with_client(endpoint: &str, client: reqwest::Client) -> Result<Self> {
        let endpoint = reqwest::Url::parse(endpoint.trim())
            .map_err(|e| AppError::Config(format!("discovery.endpoint: {}", e)))?;
        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl PeerDiscovery for HttpPeerDiscovery {
    async fn discover(&self, request: &DiscoveryRequest) -> Result<DiscoveryResult> {
        debug!(anchor = %request.anchor_url, k = request.k, "Requesting peer candidates");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = error_body(response).await;
            return Err(AppError::Internal(format!(
                "Peer discovery returned HTTP {}: {}",
                status.as_u16(),
                excerpt(&text)
            )));
        }

        response.json().await.map_err(map_reqwest_error)
    }
}

/// Stand-in when no discovery endpoint is configured; cohort proposals fail with a config error
pub struct UnconfiguredDiscovery;

#[async_trait]
impl PeerDiscovery for UnconfiguredDiscovery {
    async fn discover(&self, _request: &DiscoveryRequest) -> Result<DiscoveryResult> {
        Err(AppError::Config(
            "peer discovery endpoint is not configured".to_string(),
        ))
    }
}
