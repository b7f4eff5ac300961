//! Copilot turn execution.
//!
//! Builds the request from a `CopilotSession`, sends it through a
//! `BoxLlmProvider`, and runs the response through a fresh reasoning filter.
//! Every LLM call is wrapped in a `gen_ai.*` tracing span.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use pin_project_lite::pin_project;
use tracing::{Instrument, Span, debug, info_span};

use qognus_types::llm::{LlmError, StreamEvent};

use crate::llm::box_provider::BoxLlmProvider;
use crate::reasoning::{EventStream, ReasoningFilter, filter_stream};

use super::session::{CopilotSession, TurnId};

/// Start one streaming turn and return its id with the filtered event stream.
///
/// The user message is recorded in the session immediately. The caller
/// accumulates the emitted `TextDelta`s and hands them, with the returned
/// id, to [`CopilotSession::complete_turn`] on `Done`, or calls
/// [`CopilotSession::abort_turn`] on error.
pub fn run_turn(
    provider: &BoxLlmProvider,
    session: &mut CopilotSession,
    user_message: &str,
) -> (TurnId, EventStream) {
    let (turn, request) = session.begin_turn(user_message);

    let span = info_span!(
        "gen_ai.copilot",
        gen_ai.system = provider.name(),
        gen_ai.request.model = %request.model,
        gen_ai.request.max_tokens = request.max_tokens,
        gen_ai.request.temperature = ?request.temperature,
        gen_ai.request.stream = true,
        copilot.history_len = request.messages.len(),
    );
    debug!(parent: &span, "starting copilot turn");

    let markers = session.markers().clone();
    let raw = {
        let _enter = span.enter();
        provider.stream(request)
    };

    let events: EventStream = Box::pin(StreamInSpan {
        inner: filter_stream(raw, markers),
        span,
    });
    (turn, events)
}

/// Run one non-streaming turn and return the visible answer.
///
/// The session history is updated on success and rolled back on error.
pub async fn complete_once(
    provider: &BoxLlmProvider,
    session: &mut CopilotSession,
    user_message: &str,
) -> Result<String, LlmError> {
    let (turn, mut request) = session.begin_turn(user_message);
    request.stream = false;

    let span = info_span!(
        "gen_ai.copilot",
        gen_ai.system = provider.name(),
        gen_ai.request.model = %request.model,
        gen_ai.request.max_tokens = request.max_tokens,
        gen_ai.request.stream = false,
    );

    match provider.complete(&request).instrument(span).await {
        Ok(response) => {
            let visible = ReasoningFilter::strip(session.markers(), &response.content);
            debug!(
                raw_len = response.content.len(),
                visible_len = visible.len(),
                output_tokens = response.usage.output_tokens,
                "copilot turn complete"
            );
            session.complete_turn(turn, visible.clone());
            Ok(visible)
        }
        Err(e) => {
            session.abort_turn(turn);
            Err(e)
        }
    }
}

pin_project! {
    /// Keeps the turn's span entered while the stream is polled, so the
    /// span covers the whole response rather than just its creation.
    struct StreamInSpan<S> {
        #[pin]
        inner: S,
        span: Span,
    }
}

impl<S> Stream for StreamInSpan<S>
where
    S: Stream<Item = Result<StreamEvent, LlmError>>,
{
    type Item = Result<StreamEvent, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let _enter = this.span.enter();
        this.inner.poll_next(cx)
    }
}
