use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading the copilot configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid reasoning markers: {0}")]
    InvalidMarkers(String),
}

/// Errors from configuring a reasoning marker pair.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkerError {
    #[error("{which} marker must not be empty")]
    Empty { which: &'static str },
}
