//! Ollama `/api/chat` wire types.
//!
//! Ollama-specific request and stream-line structures. Non-streaming
//! responses are parsed through `qognus_types::response::ResponseShape`.

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub stream: bool,
    pub options: OllamaOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OllamaMessage {
    pub role: String,
    pub content: String,
}

/// Sampling options. Unset fields fall back to the model's Modelfile.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

/// One newline-delimited JSON object from a streaming `/api/chat` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OllamaStreamLine {
    #[serde(default)]
    pub message: Option<OllamaStreamMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
    /// Present instead of everything else when generation fails mid-stream.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OllamaStreamMessage {
    #[serde(default)]
    pub content: String,
    /// Reasoning returned separately by models run with thinking enabled.
    #[serde(default)]
    pub thinking: Option<String>,
}

/// Error body returned with a non-2xx status.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaErrorBody {
    pub error: String,
}
