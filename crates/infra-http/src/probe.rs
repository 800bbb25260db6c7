// HTTP Probe adapter - one collector endpoint per probe kind

use crate::client::{build_client, classify, excerpt, TransportFailure};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use signal_core::application::constants::DEFAULT_PROBE_TIMEOUT_MS;
use signal_core::domain::ProbeKind;
use signal_core::error::{AppError, Result};
use signal_core::port::{Probe, ProbeError, ProbeInput};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Scrape fields forwarded to dependent probes
const UPSTREAM_FIELDS: [&str; 3] = ["text", "meta", "raw_html"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbesConfig {
    /// Collector endpoint per probe. Probes without one are reported as not configured.
    pub endpoints: BTreeMap<ProbeKind, String>,
    pub request_timeout_ms: u64,
}

impl Default for ProbesConfig {
    fn default() -> Self {
        Self {
            endpoints: BTreeMap::new(),
            request_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
        }
    }
}

pub struct HttpProbe {
    kind: ProbeKind,
    endpoint: reqwest::Url,
    client: reqwest::Client,
    timeout_ms: u64,
}

impl HttpProbe {
    pub fn new(kind: ProbeKind, endpoint: reqwest::Url, client: reqwest::Client, timeout_ms: u64) -> Self {
        Self {
            kind,
            endpoint,
            client,
            timeout_ms,
        }
    }

    fn request_body(input: &ProbeInput) -> Value {
        let mut body = Map::new();
        body.insert("url".to_string(), Value::String(input.target.url.clone()));
        body.insert(
            "name".to_string(),
            Value::String(input.target.display_name()),
        );
        if let Some(Value::Object(upstream)) = &input.upstream {
            for field in UPSTREAM_FIELDS {
                if let Some(value) = upstream.get(field) {
                    body.insert(field.to_string(), value.clone());
                }
            }
        }
        Value::Object(body)
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn kind(&self) -> ProbeKind {
        self.kind
    }

    async fn run(&self, input: &ProbeInput) -> std::result::Result<Value, ProbeError> {
        debug!(probe = %self.kind, target = %input.target.url, "Calling probe collector");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&Self::request_body(input))
            .send()
            .await
            .map_err(|e| match classify(&e) {
                TransportFailure::Timeout => ProbeError::Timeout(self.timeout_ms),
                TransportFailure::Connect(msg) | TransportFailure::Other(msg) => {
                    ProbeError::Unavailable(msg)
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProbeError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(ProbeError::Status {
                status: status.as_u16(),
                message: excerpt(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| ProbeError::Malformed(e.to_string()))
    }
}

/// One HttpProbe per configured endpoint, sharing a single client
pub fn build_probes(config: &ProbesConfig) -> Result<Vec<Arc<dyn Probe>>> {
    let client = build_client(Duration::from_millis(config.request_timeout_ms))?;
    probes_with_client(config, client)
}

pub(crate) fn probes_with_client(
    config: &ProbesConfig,
    client: reqwest::Client,
) -> Result<Vec<Arc<dyn Probe>>> {
    config
        .endpoints
        .iter()
        .filter(|(_, endpoint)| !endpoint.trim().is_empty())
        .map(|(kind, endpoint)| {
            let url = reqwest::Url::parse(endpoint.trim()).map_err(|e| {
                AppError::Config(format!("probes.endpoints.{}: {}", kind, e))
            })?;
            Ok(Arc::new(HttpProbe::new(*kind, url, client.clone(), config.request_timeout_ms))
                as Arc<dyn Probe>)
        })
        .collect()
}
