//! Application state shared by the CLI commands and the HTTP handlers.
//!
//! Holds the loaded configuration, the one configured transport, and the
//! registry of per-surface copilot sessions used by the server.

use std::sync::Arc;

use tokio::sync::Mutex;

use qognus_core::chat::CopilotSession;
use qognus_core::llm::box_provider::BoxLlmProvider;
use qognus_core::registry::HandleRegistry;
use qognus_infra::config::resolve_api_key;
use qognus_infra::llm::create_provider;
use qognus_types::config::CopilotConfig;
use qognus_types::error::ConfigError;

/// Shared application state.
///
/// Cloning is cheap; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CopilotConfig>,
    pub provider: Arc<BoxLlmProvider>,
    /// One session per dashboard chat surface. Locked only to look up or
    /// update a session, never across an LLM stream.
    pub sessions: Arc<Mutex<HandleRegistry<CopilotSession>>>,
}

impl AppState {
    /// Build the configured transport and wrap it with an empty session registry.
    pub fn init(config: CopilotConfig) -> anyhow::Result<Self> {
        let api_key = resolve_api_key(&config);
        let provider = create_provider(&config, api_key)?;
        Ok(Self::new(config, provider))
    }

    pub fn new(config: CopilotConfig, provider: BoxLlmProvider) -> Self {
        Self {
            config: Arc::new(config),
            provider: Arc::new(provider),
            sessions: Arc::new(Mutex::new(HandleRegistry::new())),
        }
    }

    /// A fresh session using the configured model, markers and prompt.
    pub fn new_session(&self) -> Result<CopilotSession, ConfigError> {
        CopilotSession::from_config(&self.config)
    }
}
