// Port Layer - Interfaces for external dependencies

pub mod cohort_store;
pub mod id_provider; // For deterministic testing
pub mod job_store;
pub mod llm_client;
pub mod maintenance;
pub mod peer_discovery;
pub mod probe;
pub mod snapshot_store;
pub mod time_provider;
pub mod transaction;

// Re-exports
pub use cohort_store::CohortStore;
pub use id_provider::IdProvider;
pub use job_store::JobStore;
pub use llm_client::{LlmClient, LlmRequest, SynthesisError};
pub use maintenance::{Maintenance, MaintenanceConfig, MaintenanceStats};
pub use peer_discovery::{DiscoveryRequest, DiscoveryResult, PeerDiscovery};
pub use probe::{Probe, ProbeError, ProbeInput};
pub use snapshot_store::SnapshotStore;
pub use time_provider::TimeProvider;
pub use transaction::{AdmissionTransaction, Transaction, TransactionalAdmissionStore};
