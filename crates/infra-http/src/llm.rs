// Ollama-compatible LlmClient (non-streaming /api/chat)

use crate::client::{build_client, classify, error_body, excerpt, TransportFailure};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use signal_core::application::constants::DEFAULT_SYNTHESIS_TIMEOUT_MS;
use signal_core::error::{AppError, Result};
use signal_core::port::{LlmClient, LlmRequest, SynthesisError};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// e.g. `http://localhost:11434`. Synthesis always uses the fallback report when unset.
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub request_timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: "llama3.1".to_string(),
            temperature: 0.2,
            request_timeout_ms: DEFAULT_SYNTHESIS_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: ChatOptions,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

pub struct OllamaClient {
    chat_url: reqwest::Url,
    model: String,
    temperature: f32,
    timeout_ms: u64,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = build_client(Duration::from_millis(config.request_timeout_ms))?;
        Self::with_client(config, client)
    }

    pub(crate) fn with_client(config: &LlmConfig, client: reqwest::Client) -> Result<Self> {
        let base = config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| AppError::Config("llm.base_url is not set".to_string()))?;
        let chat_url = reqwest::Url::parse(&format!("{}/api/chat", base.trim_end_matches('/')))
            .map_err(|e| AppError::Config(format!("llm.base_url: {}", e)))?;

        Ok(Self {
            chat_url,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_ms: config.request_timeout_ms,
            client,
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, request: &LlmRequest) -> std::result::Result<String, SynthesisError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            stream: false,
            format: request.json_mode.then_some("json"),
            options: ChatOptions {
                temperature: self.temperature,
            },
        };
        debug!(model = %self.model, prompt_chars = request.prompt.len(), "Calling LLM");

        let response = self
            .client
            .post(self.chat_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| match classify(&e) {
                TransportFailure::Timeout => SynthesisError::Timeout(self.timeout_ms),
                TransportFailure::Connect(msg) | TransportFailure::Other(msg) => {
                    SynthesisError::Provider(msg)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = error_body(response).await;
            return Err(SynthesisError::Provider(format!(
                "HTTP {}: {}",
                status.as_u16(),
                excerpt(&text)
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::Malformed(e.to_string()))?;
        Ok(chat.message.content)
    }
}
