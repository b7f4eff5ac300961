//! Qognus copilot CLI and HTTP endpoint.
//!
//! Binary name: `qognus`
//!
//! Parses CLI arguments, loads the configuration, builds the configured
//! LLM transport, then dispatches to a command handler or starts the server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;
use tracing::warn;

use qognus_infra::config::{apply_overrides, load_config, resolve_config_path};
use qognus_observe::tracing_setup::{init_tracing, shutdown_tracing};
use qognus_types::config::CopilotConfig;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_directives(), cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need config or a transport
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "qognus", &mut std::io::stdout());
        return Ok(());
    }

    let config_path = resolve_config_path(cli.config_path.as_deref());
    let mut config = match &config_path {
        Some(path) => load_config(path).await?,
        None => CopilotConfig::default(),
    };
    apply_overrides(&mut config, cli.model.as_deref(), cli.base_url.as_deref());

    match cli.command {
        Commands::Ask { message, no_stream } => {
            let state = AppState::init(config)?;
            cli::ask::ask(&state, &message, no_stream, cli.json).await?;
        }

        Commands::Chat => {
            let state = AppState::init(config)?;
            cli::chat::loop_runner::run_chat_loop(&state).await?;
        }

        Commands::Config { check } => {
            cli::config::show_config(&config, config_path.as_deref(), check, cli.json).await?;
        }

        Commands::Serve {
            port,
            host,
            web_dir,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            if web_dir.is_some() {
                config.server.web_dir = web_dir;
            }
            serve(config, cli.quiet).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

async fn serve(config: CopilotConfig, quiet: bool) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::init(config)?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    if !quiet {
        println!(
            "  {} Qognus copilot listening on {}",
            console::style("⚡").bold(),
            console::style(format!("http://{addr}")).cyan()
        );
        println!(
            "  {}  {} via {}",
            console::style("Model:").bold(),
            console::style(&state.config.model).dim(),
            console::style(state.provider.name()).dim()
        );
        println!("  {}", console::style("Press Ctrl+C to stop").dim());
    }

    let router = http::router::build_router(state.clone());

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.sessions.lock().await.dispose_all();

    if !quiet {
        println!("\n  Server stopped.");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
