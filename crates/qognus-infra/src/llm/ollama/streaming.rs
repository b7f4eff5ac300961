//! NDJSON stream handling for Ollama `/api/chat`.
//!
//! The streaming body is one JSON object per line. HTTP chunk boundaries
//! are unrelated to line boundaries (a line, or a multi-byte character,
//! may be split across chunks), so bytes are buffered until a newline
//! arrives. The final line has `"done": true` and carries usage counts.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use qognus_types::llm::{LlmError, StopReason, StreamEvent, Usage};

use super::types::{OllamaChatRequest, OllamaStreamLine};

/// Reassembles newline-delimited records from arbitrary byte chunks.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, without the
    /// trailing `\n` (or `\r\n`). Blank lines are skipped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !line.iter().all(u8::is_ascii_whitespace) {
                lines.push(line);
            }
        }
        lines
    }

    /// Return the unterminated final line, if any.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        let rest = std::mem::take(&mut self.buf);
        if rest.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(rest)
        }
    }
}

/// Map one NDJSON line to provider-agnostic stream events.
///
/// Returns `Ok(events, done)`. An `error` field becomes `LlmError::Provider`.
pub fn process_line(line: &[u8]) -> Result<(Vec<StreamEvent>, bool), LlmError> {
    let parsed: OllamaStreamLine = serde_json::from_slice(line)
        .map_err(|e| LlmError::Deserialization(format!("ollama stream line: {e}")))?;

    if let Some(message) = parsed.error {
        return Err(LlmError::Provider { message });
    }

    let mut events = Vec::new();
    if let Some(msg) = parsed.message {
        if let Some(thinking) = msg.thinking.filter(|t| !t.is_empty()) {
            events.push(StreamEvent::ThinkingDelta { thinking });
        }
        if !msg.content.is_empty() {
            events.push(StreamEvent::TextDelta { text: msg.content });
        }
    }

    if parsed.done {
        let stop_reason = match parsed.done_reason.as_deref() {
            Some("length") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };
        events.push(StreamEvent::MessageDelta { stop_reason });
        events.push(StreamEvent::Usage(Usage {
            input_tokens: parsed.prompt_eval_count.unwrap_or(0),
            output_tokens: parsed.eval_count.unwrap_or(0),
        }));
        events.push(StreamEvent::Done);
    }

    Ok((events, parsed.done))
}

/// Map a non-2xx status and body to an `LlmError`.
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str) -> LlmError {
    let detail = serde_json::from_str::<super::types::OllamaErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.to_string());
    match status.as_u16() {
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited {
            retry_after_ms: None,
        },
        400 => LlmError::InvalidRequest(detail),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {detail}"),
        },
    }
}

/// Open a streaming `/api/chat` request and map its NDJSON body to events.
pub fn create_ollama_stream(
    client: &reqwest::Client,
    url: &str,
    body: OllamaChatRequest,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
    let client = client.clone();
    let url = url.to_string();

    Box::pin(async_stream::try_stream! {
        let response = client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %error_body, "ollama stream error response");
            Err::<(), _>(status_error(status, &error_body))?;
            return;
        }

        yield StreamEvent::Connected;

        let mut byte_stream = response.bytes_stream();
        let mut lines = LineBuffer::new();
        let mut done = false;

        'read: while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk.map_err(|e| LlmError::Stream(format!("response body read: {e}")))?;
            for line in lines.push(&chunk) {
                let (events, finished) = process_line(&line)?;
                for event in events {
                    yield event;
                }
                if finished {
                    done = true;
                    break 'read;
                }
            }
        }

        if !done {
            if let Some(line) = lines.finish() {
                let (events, finished) = process_line(&line)?;
                done = finished;
                for event in events {
                    yield event;
                }
            }
        }

        if !done {
            debug!("ollama stream closed without a done line");
            yield StreamEvent::Done;
        }
    })
}
