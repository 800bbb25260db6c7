// Shared reqwest client construction and error mapping

use signal_core::error::{AppError, Result};
use std::time::Duration;
use tracing::warn;

/// Client with a whole-request timeout. Adapters also run under the caller's own deadline.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("signal-analyst/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Transport-level failure, before any status code is known
#[derive(Debug, Clone, PartialEq)]
pub enum TransportFailure {
    Timeout,
    Connect(String),
    Other(String),
}

/// Classify a reqwest error the same way for every adapter
pub fn classify(err: &reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        TransportFailure::Timeout
    } else if err.is_connect() {
        TransportFailure::Connect(err.to_string())
    } else {
        TransportFailure::Other(err.to_string())
    }
}

/// reqwest::Error -> AppError (orphan rules keep this out of core)
pub fn map_reqwest_error(err: reqwest::Error) -> AppError {
    match classify(&err) {
        TransportFailure::Timeout => AppError::Internal(format!("HTTP request timed out: {}", err)),
        TransportFailure::Connect(msg) => AppError::Internal(format!("HTTP connect failed: {}", msg)),
        TransportFailure::Other(msg) => AppError::Internal(format!("HTTP request failed: {}", msg)),
    }
}

/// First 200 chars of an error body, for log lines and error messages
pub(crate) fn excerpt(body: &str) -> String {
    body.trim().chars().take(200).collect()
}

/// Body of a non-2xx response for the error message. An unreadable body is logged
/// and reported as empty; the status alone still fails the call.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    let status = response.status().as_u16();
    match response.text().await {
        Ok(text) => text,
        Err(e) => {
            warn!(status, error = %e, "Failed to read error response body");
            String::new()
        }
    }
}
