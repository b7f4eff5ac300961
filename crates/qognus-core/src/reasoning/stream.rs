//! Stream adapter that runs provider events through a [`ReasoningFilter`].

use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use tracing::debug;

use qognus_types::llm::{LlmError, StreamEvent};

use super::filter::{MarkerPair, ReasoningFilter};

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// Wrap a provider event stream so that only visible answer text comes out.
///
/// Every `TextDelta` goes through one filter owned by the returned stream.
/// `ThinkingDelta` events are dropped. Residual visible text is flushed as a
/// final `TextDelta` right before `Done`, and a `Done` is synthesized if the
/// inner stream ends without one. An error is forwarded and ends the stream.
pub fn filter_stream(mut inner: EventStream, markers: MarkerPair) -> EventStream {
    Box::pin(async_stream::stream! {
        let mut filter = ReasoningFilter::new(markers);
        let mut thinking_dropped = 0usize;

        while let Some(item) = inner.next().await {
            match item {
                Ok(StreamEvent::TextDelta { text }) => {
                    let visible = filter.feed(&text);
                    if !visible.is_empty() {
                        yield Ok(StreamEvent::TextDelta { text: visible });
                    }
                }
                Ok(StreamEvent::ThinkingDelta { thinking }) => {
                    thinking_dropped += thinking.len();
                }
                Ok(StreamEvent::Done) => {
                    let residual = filter.finish();
                    if !residual.is_empty() {
                        yield Ok(StreamEvent::TextDelta { text: residual });
                    }
                    debug!(
                        hidden_bytes = filter.hidden_bytes(),
                        thinking_dropped,
                        "filtered stream done"
                    );
                    yield Ok(StreamEvent::Done);
                    return;
                }
                Ok(other) => yield Ok(other),
                Err(e) => {
                    debug!(error = %e, "provider stream failed; dropping filter");
                    yield Err(e);
                    return;
                }
            }
        }

        let residual = filter.finish();
        if !residual.is_empty() {
            yield Ok(StreamEvent::TextDelta { text: residual });
        }
        debug!(
            hidden_bytes = filter.hidden_bytes(),
            "provider stream ended without done; synthesizing done"
        );
        yield Ok(StreamEvent::Done);
    })
}
