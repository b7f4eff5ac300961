//! Copilot configuration types.
//!
//! `CopilotConfig` represents the `config.toml` that selects the LLM
//! transport, the reasoning marker contract, and the HTTP server settings.

use serde::{Deserialize, Serialize};

use crate::llm::ProviderType;

/// Top-level configuration for the copilot.
///
/// Loaded from `{config_dir}/qognus/config.toml`. All fields have defaults
/// that match a stock local Ollama install.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopilotConfig {
    /// Which transport to talk to.
    #[serde(default = "default_provider")]
    pub provider: ProviderType,

    /// Base URL of the transport (`http://localhost:11434` for Ollama,
    /// `.../v1` for OpenAI-compatible servers).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Chat model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable that holds the API key, if the
    /// transport needs one.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Literal marker that opens a hidden reasoning span.
    #[serde(default = "default_open_marker")]
    pub open_marker: String,

    /// Literal marker that closes a hidden reasoning span.
    #[serde(default = "default_close_marker")]
    pub close_marker: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Replaces the built-in copilot system prompt when set.
    #[serde(default)]
    pub system_prompt: Option<String>,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Settings for `qognus serve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the built dashboard; served as the fallback route
    /// when present.
    #[serde(default)]
    pub web_dir: Option<String>,
}

fn default_provider() -> ProviderType {
    ProviderType::Ollama
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "qwen3:latest".to_string()
}

fn default_open_marker() -> String {
    "<think>".to_string()
}

fn default_close_marker() -> String {
    "</think>".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f64 {
    0.3
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for CopilotConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: None,
            open_marker: default_open_marker(),
            close_marker: default_close_marker(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            system_prompt: None,
            server: ServerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            web_dir: None,
        }
    }
}
