//! Configuration loader for the copilot.
//!
//! Reads `config.toml` and deserializes it into [`CopilotConfig`]. Only a
//! missing file falls back to defaults. A file that exists but does not
//! parse is an error: falling back would silently swap custom reasoning
//! markers for the default pair and leak reasoning to the user.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use tracing::{debug, warn};

use qognus_core::reasoning::MarkerPair;
use qognus_types::config::CopilotConfig;
use qognus_types::error::ConfigError;

/// `{config_dir}/qognus/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("qognus").join("config.toml"))
}

/// Pick the config file: an explicit path wins over the platform default.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(default_config_path)
}

/// Parse config TOML. `path` is only used for the error message.
pub fn parse_config(content: &str, path: &Path) -> Result<CopilotConfig, ConfigError> {
    toml::from_str::<CopilotConfig>(content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })
}

/// Load the configuration from `path`.
///
/// - Missing file: [`CopilotConfig::default()`].
/// - Unreadable file (permissions, a directory): [`ConfigError::Read`].
/// - Malformed TOML or unknown value types: [`ConfigError::Parse`].
/// - Empty open or close marker: [`ConfigError::InvalidMarkers`].
pub async fn load_config(path: &Path) -> Result<CopilotConfig, ConfigError> {
    let config = match tokio::fs::read_to_string(path).await {
        Ok(content) => parse_config(&content, path)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("No config.toml found at {}, using defaults", path.display());
            CopilotConfig::default()
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    marker_pair(&config)?;
    Ok(config)
}

/// Build the configured marker pair.
pub fn marker_pair(config: &CopilotConfig) -> Result<MarkerPair, ConfigError> {
    MarkerPair::new(&config.open_marker, &config.close_marker)
        .map_err(|e| ConfigError::InvalidMarkers(e.to_string()))
}

/// Apply command-line overrides on top of the loaded file.
pub fn apply_overrides(config: &mut CopilotConfig, model: Option<&str>, base_url: Option<&str>) {
    if let Some(model) = model {
        config.model = model.to_string();
    }
    if let Some(base_url) = base_url {
        config.base_url = base_url.to_string();
    }
}

/// Read the API key from the environment variable named by `api_key_env`.
///
/// Returns `None` when no variable is configured or it is unset.
pub fn resolve_api_key(config: &CopilotConfig) -> Option<SecretString> {
    let var = config.api_key_env.as_deref()?;
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Some(SecretString::from(value)),
        _ => {
            warn!(env = var, "API key variable is not set");
            None
        }
    }
}
