// LLM Client Port - text generation collaborator used by synthesis

use async_trait::async_trait;
use thiserror::Error;

/// Any of these triggers the deterministic fallback report
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    #[error("LLM call timed out after {0}ms")]
    Timeout(u64),

    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("malformed LLM response: {0}")]
    Malformed(String),

    #[error("LLM response missing section '{0}'")]
    MissingSection(String),

    #[error("LLM synthesis disabled")]
    Disabled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub system: String,
    pub prompt: String,
    /// Ask the provider for a JSON object response
    pub json_mode: bool,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Return the raw completion text
    async fn generate(&self, request: &LlmRequest) -> Result<String, SynthesisError>;
}

/// Client used when no LLM endpoint is configured
pub struct DisabledLlmClient;

#[async_trait]
impl LlmClient for DisabledLlmClient {
    async fn generate(&self, _request: &LlmRequest) -> Result<String, SynthesisError> {
        Err(SynthesisError::Disabled)
    }
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Returns a fixed response (or error) and counts calls
    pub struct MockLlmClient {
        response: Result<String, SynthesisError>,
        delay: Option<Duration>,
        calls: AtomicUsize,
        last_request: Mutex<Option<LlmRequest>>,
    }

    impl MockLlmClient {
        pub fn responding(text: impl Into<String>) -> Self {
            Self {
                response: Ok(text.into()),
                delay: None,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }
        }

        pub fn failing(error: SynthesisError) -> Self {
            Self {
                response: Err(error),
                delay: None,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_request(&self) -> Option<LlmRequest> {
            self.last_request.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn generate(&self, request: &LlmRequest) -> Result<String, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.response.clone()
        }
    }
}
