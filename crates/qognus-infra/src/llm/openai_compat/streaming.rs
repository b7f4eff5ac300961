//! OpenAI SSE stream to [`StreamEvent`] adapter.
//!
//! Maps `async-openai`'s [`ChatCompletionResponseStream`] to the
//! provider-agnostic [`StreamEvent`] enum. Content deltas are forwarded
//! verbatim; reasoning markers inside them are handled downstream.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};

use async_openai::types::chat::{ChatCompletionResponseStream, FinishReason};

use qognus_types::llm::{LlmError, StopReason, StreamEvent, Usage};

/// Map an OpenAI finish reason to a [`StopReason`].
pub fn stop_reason_for(reason: &FinishReason) -> StopReason {
    match reason {
        FinishReason::Length => StopReason::MaxTokens,
        FinishReason::Stop
        | FinishReason::ContentFilter
        | FinishReason::ToolCalls
        | FinishReason::FunctionCall => StopReason::EndTurn,
    }
}

/// Map an async-openai [`ChatCompletionResponseStream`] to [`StreamEvent`]s.
///
/// Emits `Connected`, then `TextDelta`s in order, `MessageDelta` on the
/// finish reason, `Usage` when the server reports it (requires
/// `stream_options.include_usage`), and finally `Done`.
pub fn map_openai_stream(
    stream: ChatCompletionResponseStream,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
    Box::pin(async_stream::try_stream! {
        yield StreamEvent::Connected;

        let mut stream = stream;

        while let Some(result) = stream.next().await {
            let chunk = result.map_err(|e| LlmError::Stream(e.to_string()))?;

            if let Some(usage) = &chunk.usage {
                yield StreamEvent::Usage(Usage {
                    input_tokens: usage.prompt_tokens,
                    output_tokens: usage.completion_tokens,
                });
            }

            for choice in &chunk.choices {
                if let Some(text) = choice.delta.content.as_ref().filter(|t| !t.is_empty()) {
                    yield StreamEvent::TextDelta { text: text.clone() };
                }
                if let Some(reason) = &choice.finish_reason {
                    yield StreamEvent::MessageDelta {
                        stop_reason: stop_reason_for(reason),
                    };
                }
            }
        }

        yield StreamEvent::Done;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_to_stop_reason_mapping() {
        let cases = [
            (FinishReason::Stop, StopReason::EndTurn),
            (FinishReason::Length, StopReason::MaxTokens),
            (FinishReason::ContentFilter, StopReason::EndTurn),
            (FinishReason::ToolCalls, StopReason::EndTurn),
        ];
        for (finish, expected) in cases {
            assert_eq!(stop_reason_for(&finish), expected);
        }
    }
}
