//! `qognus config`: print the effective configuration and optionally
//! check that the configured transport answers.

use std::path::Path;

use console::style;

use qognus_infra::llm::test_provider_connection;
use qognus_types::config::CopilotConfig;

use crate::state::AppState;

/// Show the effective configuration (file merged with CLI overrides).
pub async fn show_config(
    config: &CopilotConfig,
    path: Option<&Path>,
    check: bool,
    json: bool,
) -> anyhow::Result<()> {
    let path_display = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());

    let connection = if check {
        let state = AppState::init(config.clone())?;
        Some(test_provider_connection(&state.provider).await)
    } else {
        None
    };

    if json {
        let out = serde_json::json!({
            "path": path_display,
            "config": config,
            "connection": connection.as_ref().map(|result| match result {
                Ok(()) => serde_json::json!({ "ok": true }),
                Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }),
            }),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        println!("  {} {}", style("Config:").bold(), style(&path_display).dim());
        println!();
        for line in toml::to_string_pretty(config)?.lines() {
            println!("  {line}");
        }
        if let Some(result) = &connection {
            println!();
            match result {
                Ok(()) => println!(
                    "  {} {} at {} is reachable",
                    style("✓").green(),
                    config.provider,
                    style(&config.base_url).cyan()
                ),
                Err(e) => println!(
                    "  {} {} at {}: {e}",
                    style("✗").red(),
                    config.provider,
                    style(&config.base_url).cyan()
                ),
            }
        }
        println!();
    }

    if let Some(Err(e)) = connection {
        return Err(e.into());
    }
    Ok(())
}
