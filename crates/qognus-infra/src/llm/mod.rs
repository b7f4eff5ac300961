//! LLM transport implementations.
//!
//! Concrete implementations of the [`LlmProvider`] trait defined in
//! `qognus-core`: a native Ollama client and an OpenAI-compatible client.
//!
//! [`create_provider`] builds the configured transport and
//! [`test_provider_connection`] verifies it responds.
//!
//! [`LlmProvider`]: qognus_core::llm::provider::LlmProvider

pub mod ollama;
pub mod openai_compat;

use secrecy::SecretString;
use tracing::{debug, warn};

use qognus_core::llm::box_provider::BoxLlmProvider;
use qognus_types::config::CopilotConfig;
use qognus_types::llm::{CompletionRequest, LlmError, Message, ProviderType};

use self::ollama::OllamaProvider;
use self::openai_compat::OpenAiCompatibleProvider;

/// Create a [`BoxLlmProvider`] for the transport named in `config`.
///
/// `api_key` is only used by OpenAI-compatible transports; Ollama has no
/// authentication.
pub fn create_provider(
    config: &CopilotConfig,
    api_key: Option<SecretString>,
) -> Result<BoxLlmProvider, LlmError> {
    debug!(
        provider = %config.provider,
        base_url = %config.base_url,
        model = %config.model,
        "creating LLM provider"
    );
    match config.provider {
        ProviderType::Ollama => {
            let provider = OllamaProvider::new(config.base_url.clone(), config.model.clone())?;
            Ok(BoxLlmProvider::new(provider))
        }
        ProviderType::OpenAiCompatible => {
            let hosted = openai_compat::config::is_hosted_openai(&config.base_url);
            let provider = match api_key {
                Some(key) if hosted => OpenAiCompatibleProvider::hosted(key, &config.model),
                api_key => {
                    if hosted {
                        warn!("hosted OpenAI API configured without an API key");
                    }
                    OpenAiCompatibleProvider::local(&config.base_url, &config.model, api_key)
                }
            };
            Ok(BoxLlmProvider::new(provider))
        }
    }
}

/// Send a minimal non-streaming request to verify the transport responds.
pub async fn test_provider_connection(provider: &BoxLlmProvider) -> Result<(), LlmError> {
    let request = CompletionRequest {
        model: String::new(), // provider default
        messages: vec![Message::user("Hello")],
        system: None,
        max_tokens: 10,
        temperature: Some(0.0),
        stream: false,
        stop_sequences: None,
    };
    provider.complete(&request).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_ollama() {
        let config = CopilotConfig::default();
        let provider = create_provider(&config, None).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert!(provider.capabilities().native_thinking);
    }

    #[test]
    fn test_create_provider_openai_compatible() {
        let config = CopilotConfig {
            provider: ProviderType::OpenAiCompatible,
            base_url: "http://localhost:8080/v1".to_string(),
            ..CopilotConfig::default()
        };
        let provider = create_provider(&config, Some(SecretString::from("local-key"))).unwrap();
        assert_eq!(provider.name(), "openai_compatible");
        assert!(!provider.capabilities().native_thinking);
    }

    #[test]
    fn test_create_provider_hosted_openai() {
        let config = CopilotConfig {
            provider: ProviderType::OpenAiCompatible,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            ..CopilotConfig::default()
        };
        let provider = create_provider(&config, Some(SecretString::from("sk-test"))).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.capabilities().max_output_tokens, 16_384);
    }

    #[tokio::test]
    async fn test_connection_to_closed_port_fails() {
        let config = CopilotConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..CopilotConfig::default()
        };
        let provider = create_provider(&config, None).unwrap();
        let err = test_provider_connection(&provider).await.unwrap_err();
        assert!(matches!(err, LlmError::Provider { .. }));
    }
}
