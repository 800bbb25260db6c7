// Probe Port - external signal collectors

use crate::domain::{ProbeKind, Target};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Probe failure. Never aborts a job: the merger turns it into an errored section.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("reported failure: {0}")]
    Reported(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("no collector configured for {0}")]
    NotConfigured(ProbeKind),
}

/// Probe input. `upstream` carries web_scrape output for the probes that depend on it.
#[derive(Debug, Clone)]
pub struct ProbeInput {
    pub target: Target,
    pub upstream: Option<Value>,
}

impl ProbeInput {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            upstream: None,
        }
    }

    pub fn with_upstream(mut self, upstream: Option<Value>) -> Self {
        self.upstream = upstream;
        self
    }
}

/// One external collector producing one profile section
#[async_trait]
pub trait Probe: Send + Sync {
    fn kind(&self) -> ProbeKind;

    /// Produce the section payload for a target
    async fn run(&self, input: &ProbeInput) -> Result<Value, ProbeError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone)]
    pub enum Script {
        Return(Value),
        Fail(ProbeError),
        Sleep(Duration, Value),
        Panic,
    }

    /// Probe returning a scripted outcome and recording its inputs
    pub struct ScriptedProbe {
        kind: ProbeKind,
        script: Script,
        calls: Arc<Mutex<Vec<ProbeInput>>>,
    }

    impl ScriptedProbe {
        pub fn new(kind: ProbeKind, script: Script) -> Self {
            Self {
                kind,
                script,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn returning(kind: ProbeKind, value: Value) -> Self {
            Self::new(kind, Script::Return(value))
        }

        pub fn failing(kind: ProbeKind, error: ProbeError) -> Self {
            Self::new(kind, Script::Fail(error))
        }

        pub fn calls(&self) -> Vec<ProbeInput> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Probe for ScriptedProbe {
        fn kind(&self) -> ProbeKind {
            self.kind
        }

        async fn run(&self, input: &ProbeInput) -> Result<Value, ProbeError> {
            self.calls.lock().unwrap().push(input.clone());
            match &self.script {
                Script::Return(value) => Ok(value.clone()),
                Script::Fail(err) => Err(err.clone()),
                Script::Sleep(duration, value) => {
                    tokio::time::sleep(*duration).await;
                    Ok(value.clone())
                }
                Script::Panic => panic!("scripted probe panic"),
            }
        }
    }
}
