//! CLI command definitions for the `qognus` binary.
//!
//! Uses clap derive macros for argument parsing. Global flags select the
//! config file and override the model or transport URL for one invocation.

pub mod ask;
pub mod chat;
pub mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Reasoning-aware copilot for the ApexGrid dashboard.
#[derive(Parser)]
#[command(name = "qognus", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export copilot spans as OpenTelemetry traces on stdout.
    #[arg(long, global = true)]
    pub otel: bool,

    /// Path to config.toml (defaults to the platform config directory).
    #[arg(long = "config", global = true, env = "QOGNUS_CONFIG")]
    pub config_path: Option<PathBuf>,

    /// Override the configured chat model.
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Override the configured transport base URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask the copilot a single question and print the visible answer.
    Ask {
        /// The question to ask.
        message: String,

        /// Wait for the whole response instead of streaming it.
        #[arg(long)]
        no_stream: bool,
    },

    /// Start an interactive copilot session.
    Chat,

    /// Start the HTTP copilot endpoint.
    Serve {
        /// Port to listen on (overrides `[server].port`).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides `[server].host`).
        #[arg(long)]
        host: Option<String>,

        /// Directory with the built dashboard to serve as fallback.
        #[arg(long)]
        web_dir: Option<String>,
    },

    /// Show the effective configuration.
    Config {
        /// Also send a tiny request to verify the transport responds.
        #[arg(long)]
        check: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

impl Cli {
    /// Tracing directives for the selected verbosity.
    pub fn log_directives(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,qognus=debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_globals() {
        let cli = Cli::try_parse_from([
            "qognus",
            "ask",
            "Which cluster grew fastest?",
            "--model",
            "deepseek-r1",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.model.as_deref(), Some("deepseek-r1"));
        match cli.command {
            Commands::Ask { message, no_stream } => {
                assert_eq!(message, "Which cluster grew fastest?");
                assert!(!no_stream);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli =
            Cli::try_parse_from(["qognus", "serve", "-p", "8088", "--host", "0.0.0.0"]).unwrap();
        match cli.command {
            Commands::Serve {
                port,
                host,
                web_dir,
            } => {
                assert_eq!(port, Some(8088));
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert!(web_dir.is_none());
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_config_flag_and_subcommand() {
        let cli =
            Cli::try_parse_from(["qognus", "--config", "/tmp/q.toml", "config", "--check"])
                .unwrap();
        assert_eq!(cli.config_path, Some(PathBuf::from("/tmp/q.toml")));
        assert!(matches!(cli.command, Commands::Config { check: true }));
    }

    #[test]
    fn test_log_directives() {
        let mut cli = Cli::try_parse_from(["qognus", "chat"]).unwrap();
        assert_eq!(cli.log_directives(), "warn");
        cli.quiet = true;
        assert_eq!(cli.log_directives(), "error");
        cli.verbose = 1;
        assert_eq!(cli.log_directives(), "info,qognus=debug");
        cli.verbose = 3;
        assert_eq!(cli.log_directives(), "trace");
    }

    #[test]
    fn test_ask_requires_message() {
        assert!(Cli::try_parse_from(["qognus", "ask"]).is_err());
    }
}
