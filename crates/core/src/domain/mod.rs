// Domain Layer - Pure business logic and entities

pub mod cohort;
pub mod error;
pub mod job;
pub mod probe;
pub mod profile;
pub mod report;
pub mod snapshot;

// Re-exports
pub use cohort::{
    CandidateConfidence, Cohort, CohortCandidate, CohortId, CohortMatrix, CohortNorms,
    CohortOutlier, CohortStatus, OutlierDirection, SeoHygiene, SocialVisibility, TargetSignals,
    TechConfidence,
};
pub use error::DomainError;
pub use job::{Job, JobId, JobPatch, JobResult, JobStatus, OwnerKey, Target};
pub use probe::ProbeKind;
pub use profile::{is_nonempty, Company, CompanyProfile, Presence, ProbeResult, SectionKey};
pub use report::{Report, ReportSection, ReportSource, ReportStyle, DEFAULT_FOCUS};
pub use snapshot::{Delta, FieldChange, FieldDelta, Snapshot};
