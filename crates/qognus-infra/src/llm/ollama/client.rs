//! OllamaProvider -- [`LlmProvider`] for a local Ollama server.
//!
//! Talks to the native `/api/chat` endpoint: NDJSON streaming for `stream`,
//! a single JSON body for `complete`. No authentication.

use std::pin::Pin;
use std::time::Duration;

use futures_util::Stream;
use tracing::debug;

use qognus_core::llm::provider::LlmProvider;
use qognus_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason, StreamEvent,
    Usage,
};
use qognus_types::response::ResponseShape;

use super::streaming::{create_ollama_stream, status_error};
use super::types::{OllamaChatRequest, OllamaMessage, OllamaOptions};

/// Ollama LLM provider.
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    capabilities: ProviderCapabilities,
}

impl OllamaProvider {
    /// Default Ollama host.
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:11434";

    /// Create a provider for `model` served at `base_url`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            // Local models can take minutes on CPU.
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            capabilities: ProviderCapabilities {
                streaming: true,
                native_thinking: true,
                max_context_tokens: 32_768,
                max_output_tokens: 8_192,
            },
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Convert a generic [`CompletionRequest`] into an Ollama chat request.
    ///
    /// The system prompt becomes the first message. An empty request model
    /// falls back to the provider's model.
    fn to_ollama_request(&self, request: &CompletionRequest, stream: bool) -> OllamaChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(OllamaMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.extend(request.messages.iter().map(|m| OllamaMessage {
            role: m.role.to_string(),
            content: m.content.clone(),
        }));

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        OllamaChatRequest {
            model,
            messages,
            stream,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: Some(request.max_tokens),
                stop: request.stop_sequences.clone(),
            },
        }
    }
}

impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.to_ollama_request(request, false);
        let url = self.url("/api/chat");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Stream(format!("response body read: {e}")))?;
        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let shape =
            ResponseShape::parse(&text).map_err(|e| LlmError::Deserialization(e.to_string()))?;
        debug!(shape = shape.kind(), "ollama response parsed");

        let usage = match &shape {
            ResponseShape::OllamaChat(r) => Usage {
                input_tokens: r.prompt_eval_count.unwrap_or(0),
                output_tokens: r.eval_count.unwrap_or(0),
            },
            _ => Usage::default(),
        };
        let model = shape.model().unwrap_or(&body.model).to_string();
        let content = shape
            .into_text()
            .map_err(|e| LlmError::Deserialization(e.to_string()))?;

        Ok(CompletionResponse {
            id: String::new(),
            content,
            model,
            stop_reason: StopReason::EndTurn,
            usage,
        })
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        let body = self.to_ollama_request(&request, true);
        create_ollama_stream(&self.client, &self.url("/api/chat"), body)
    }
}
