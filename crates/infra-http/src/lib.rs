// Signal Infrastructure - HTTP Adapters
// Implements: Probe, LlmClient, PeerDiscovery

pub mod client;
pub mod discovery;
pub mod llm;
pub mod probe;

#[cfg(test)]
pub(crate) mod test_server;

pub use client::{build_client, map_reqwest_error};
pub use discovery::{DiscoveryConfig, HttpPeerDiscovery, UnconfiguredDiscovery};
pub use llm::{LlmConfig, OllamaClient};
pub use probe::{build_probes, HttpProbe, ProbesConfig};
