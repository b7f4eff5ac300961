//! Configuration for OpenAI-compatible transports.
//!
//! Local inference servers (llama.cpp `server`, vLLM, LM Studio) and hosted
//! APIs all speak `/chat/completions`; only the base URL, key and limits
//! differ.

use secrecy::SecretString;

use qognus_types::llm::ProviderCapabilities;

/// Configuration for an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Provider name reported in logs and spans.
    pub provider_name: String,
    /// Base URL including the version segment (e.g. `http://localhost:8080/v1`).
    pub base_url: String,
    /// API key. Local servers usually accept any value, so `None` is allowed.
    pub api_key: Option<SecretString>,
    pub model: String,
    pub capabilities: ProviderCapabilities,
}

/// A self-hosted OpenAI-compatible server.
///
/// Reasoning arrives inline between markers, so no native thinking.
pub fn local_defaults(base_url: &str, model: &str, api_key: Option<SecretString>) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai_compatible".into(),
        base_url: base_url.trim_end_matches('/').into(),
        api_key,
        model: model.into(),
        capabilities: ProviderCapabilities {
            streaming: true,
            native_thinking: false,
            max_context_tokens: 32_768,
            max_output_tokens: 8_192,
        },
    }
}

/// Base URL of the hosted OpenAI API.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Whether `base_url` points at the hosted OpenAI API rather than a local server.
pub fn is_hosted_openai(base_url: &str) -> bool {
    base_url.trim_end_matches('/') == OPENAI_API_BASE
}

/// The hosted OpenAI API.
pub fn openai_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: OPENAI_API_BASE.into(),
        api_key: Some(api_key),
        model: model.into(),
        capabilities: ProviderCapabilities {
            streaming: true,
            native_thinking: false,
            max_context_tokens: 128_000,
            max_output_tokens: 16_384,
        },
    }
}
