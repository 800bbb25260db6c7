// Application Layer - Use Cases and Business Logic

pub mod analysis;
pub mod cohort;
pub mod constants;
pub mod delta;
pub mod gate;
pub mod maintenance;
pub mod merger;
pub mod orchestrator;
pub mod planner;
pub mod recovery;
pub mod synthesis;
pub mod validator;
pub mod worker;

// Re-exports
pub use analysis::{AnalysisService, SubmitRequest};
pub use cohort::{CohortResults, CohortService, MemberProgress, ProposeRequest};
pub use gate::{AdmissionGate, GateConfig};
pub use maintenance::MaintenanceScheduler;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use recovery::{RecoveryReport, RecoveryService};
pub use synthesis::Synthesizer;
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker};
