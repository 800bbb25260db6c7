// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
///
/// Admission failures (`Validation`, `Auth`, `RateLimited`, `QuotaExceeded`) are returned
/// before a job exists. `Probe` and `Synthesis` are absorbed into the job result and only
/// surface from adapter calls. `Database` is the one fault that fails a running job.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Daily quota exceeded ({remaining} remaining), resets at {reset_at}")]
    QuotaExceeded { remaining: u32, reset_at: i64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Probe error: {0}")]
    Probe(#[from] crate::port::ProbeError),

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] crate::port::SynthesisError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for errors raised while admitting a request (no job was created)
    pub fn is_admission_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::Auth(_)
                | AppError::RateLimited { .. }
                | AppError::QuotaExceeded { .. }
        )
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error and reqwest::Error conversions live in the infra crates
// (orphan rules), each mapping into AppError through a helper function
