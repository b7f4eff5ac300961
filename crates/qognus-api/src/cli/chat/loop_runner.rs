//! Main chat loop orchestration.
//!
//! Reads a line, streams the filtered answer token by token, and records
//! the visible answer in the session. Reasoning never reaches the terminal.

use std::io::Write;
use std::time::{Duration, Instant};

use console::style;
use crossterm::style::Color;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use qognus_core::chat::{CopilotSession, run_turn};
use qognus_types::llm::{MessageRole, StreamEvent, Usage};

use crate::state::AppState;

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::ChatRenderer;

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(spinner_style);
    }
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Run the interactive copilot session until EOF or `/exit`.
pub async fn run_chat_loop(state: &AppState) -> anyhow::Result<()> {
    let mut session = state.new_session()?;

    print_welcome_banner(state.provider.name(), session.model(), session.markers());

    let renderer = ChatRenderer::new(Some(Color::Cyan));
    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) = ChatInput::new(prompt)
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    let mut turns: u32 = 0;

    loop {
        let text = match chat_input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("Session ended.").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
                continue;
            }
            InputEvent::Message(text) if text.is_empty() => continue,
            InputEvent::Message(text) => text,
        };

        if let Some(cmd) = commands::parse(&text) {
            match cmd {
                ChatCommand::Help => commands::print_help(),
                ChatCommand::Clear => chat_input.clear(),
                ChatCommand::Exit => {
                    println!("\n  {}", style("Session ended.").dim());
                    break;
                }
                ChatCommand::New => {
                    session.clear();
                    println!("\n  {} Conversation cleared.\n", style("*").cyan().bold());
                }
                ChatCommand::History => print_history(&session, &renderer),
                ChatCommand::Unknown(cmd_name) => {
                    println!(
                        "\n  {} Unknown command: {}. Type /help for available commands.\n",
                        style("?").yellow().bold(),
                        style(cmd_name).dim()
                    );
                }
            }
            continue;
        }

        let spinner = thinking_spinner();
        let start_time = Instant::now();
        let (turn, mut stream) = run_turn(&state.provider, &mut session, &text);
        let mut full_response = String::new();
        let mut usage: Option<Usage> = None;
        let mut first_token_received = false;
        let mut had_error = false;

        while let Some(event_result) = stream.next().await {
            match event_result {
                Ok(StreamEvent::TextDelta { text: delta }) => {
                    if !first_token_received {
                        spinner.finish_and_clear();
                        first_token_received = true;
                        print!("\n  {} ", style("Copilot").cyan().bold());
                        let _ = std::io::stdout().flush();
                    }
                    renderer.print_streaming_token(&delta);
                    full_response.push_str(&delta);
                }
                Ok(StreamEvent::Usage(u)) => usage = Some(u),
                Ok(StreamEvent::Done) => break,
                Ok(_) => {}
                Err(e) => {
                    spinner.finish_and_clear();
                    eprintln!("\n  {} LLM error: {e}", style("!").red().bold());
                    eprintln!("  {}", style("Type a message to retry, /exit to quit.").dim());
                    had_error = true;
                    break;
                }
            }
        }

        if !first_token_received {
            spinner.finish_and_clear();
        }
        if had_error {
            session.abort_turn(turn);
            continue;
        }

        // The model may spend the whole turn reasoning.
        if full_response.trim().is_empty() {
            println!("\n  {}", style("(no visible answer)").dim());
        }

        let response_ms = start_time.elapsed().as_millis() as u64;
        println!();
        renderer.print_stats_footer(usage.as_ref(), response_ms, session.model());
        println!();

        session.complete_turn(turn, full_response);
        turns += 1;
    }

    info!(turns, "chat session finished");
    Ok(())
}

fn print_history(session: &CopilotSession, renderer: &ChatRenderer) {
    println!();
    if session.history().is_empty() {
        println!("  {}\n", style("No messages yet.").dim());
        return;
    }
    for msg in session.history() {
        match msg.role {
            MessageRole::User => {
                println!("  {} {}", style("You").green().bold(), msg.content);
            }
            _ => {
                println!("  {}", style("Copilot").cyan().bold());
                for line in renderer.render_final(&msg.content).lines() {
                    println!("    {line}");
                }
            }
        }
    }
    println!();
}
