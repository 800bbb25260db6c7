//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use serde_json::json;
use signal_core::domain::DomainError;
use signal_core::error::AppError;
use tracing::error;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const FORBIDDEN: i32 = 4003;
    pub const UNAUTHORIZED: i32 = 4010;
    pub const RATE_LIMITED: i32 = 4029;
    pub const QUOTA_EXCEEDED: i32 = 4030;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let message = err.to_string();
    match err {
        AppError::Validation(_) | AppError::Serialization(_) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, message, None::<()>)
        }
        AppError::Domain(e) => match e {
            DomainError::InvalidStateTransition { .. } | DomainError::TerminalJob(_) => {
                ErrorObjectOwned::owned(code::CONFLICT, message, None::<()>)
            }
            _ => ErrorObjectOwned::owned(code::VALIDATION_ERROR, message, None::<()>),
        },
        AppError::Auth(_) => ErrorObjectOwned::owned(code::UNAUTHORIZED, message, None::<()>),
        AppError::RateLimited { retry_after_secs } => ErrorObjectOwned::owned(
            code::RATE_LIMITED,
            message,
            Some(json!({ "retry_after_secs": retry_after_secs })),
        ),
        AppError::QuotaExceeded {
            remaining,
            reset_at,
        } => ErrorObjectOwned::owned(
            code::QUOTA_EXCEEDED,
            message,
            Some(json!({ "remaining": remaining, "reset_at": reset_at })),
        ),
        AppError::NotFound(_) => ErrorObjectOwned::owned(code::NOT_FOUND, message, None::<()>),
        AppError::Forbidden(_) => ErrorObjectOwned::owned(code::FORBIDDEN, message, None::<()>),
        AppError::Conflict(_) | AppError::InvalidState(_) => {
            ErrorObjectOwned::owned(code::CONFLICT, message, None::<()>)
        }
        AppError::Database(_) => {
            error!(error = %message, "Store failure while serving request");
            ErrorObjectOwned::owned(code::DB_ERROR, message, None::<()>)
        }
        AppError::Probe(_)
        | AppError::Synthesis(_)
        | AppError::Config(_)
        | AppError::Internal(_) => {
            error!(error = %message, "Internal failure while serving request");
            ErrorObjectOwned::owned(code::INTERNAL_ERROR, message, None::<()>)
        }
    }
}
