//! One-shot `qognus ask`.
//!
//! Streams the visible answer to stdout as it arrives, or waits for the full
//! response with `--no-stream`. With `--json` the answer is printed once as
//! a JSON object.

use std::io::Write;
use std::time::Instant;

use futures_util::StreamExt;

use qognus_core::chat::{complete_once, run_turn};
use qognus_types::llm::{StreamEvent, Usage};

use crate::state::AppState;

/// Ask a single question in a fresh session.
pub async fn ask(state: &AppState, message: &str, no_stream: bool, json: bool) -> anyhow::Result<()> {
    let mut session = state.new_session()?;
    let start = Instant::now();

    let (answer, usage) = if no_stream {
        let answer = complete_once(&state.provider, &mut session, message).await?;
        if !json {
            println!("{answer}");
        }
        (answer, None)
    } else {
        let (_, mut stream) = run_turn(&state.provider, &mut session, message);
        let mut answer = String::new();
        let mut usage: Option<Usage> = None;

        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::TextDelta { text } => {
                    if !json {
                        print!("{text}");
                        let _ = std::io::stdout().flush();
                    }
                    answer.push_str(&text);
                }
                StreamEvent::Usage(u) => usage = Some(u),
                StreamEvent::Done => break,
                _ => {}
            }
        }
        if !json {
            println!();
        }
        (answer, usage)
    };

    if json {
        let out = serde_json::json!({
            "answer": answer,
            "model": session.model(),
            "provider": state.provider.name(),
            "usage": usage,
            "response_ms": start.elapsed().as_millis() as u64,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    }

    Ok(())
}
