//! The configured transport as a trait object.
//!
//! The copilot picks Ollama or an OpenAI-compatible server from
//! configuration at startup and shares that one transport across every
//! surface. `LlmProvider::complete` returns `impl Future`, which rules out
//! `dyn LlmProvider`; the private `ErasedProvider` trait boxes the future so
//! [`BoxLlmProvider`] can hold either transport.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;
use tracing::debug;

use qognus_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StreamEvent,
};

use super::provider::LlmProvider;

type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + 'a>>;

type RawEventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

trait ErasedProvider: Send + Sync {
    fn name(&self) -> &str;
    fn capabilities(&self) -> &ProviderCapabilities;
    fn complete_erased<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a>;
    fn stream_erased(&self, request: CompletionRequest) -> RawEventStream;
}

impl<P: LlmProvider> ErasedProvider for P {
    fn name(&self) -> &str {
        LlmProvider::name(self)
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        LlmProvider::capabilities(self)
    }

    fn complete_erased<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        Box::pin(LlmProvider::complete(self, request))
    }

    fn stream_erased(&self, request: CompletionRequest) -> RawEventStream {
        LlmProvider::stream(self, request)
    }
}

/// The transport selected at startup. Output is raw model text; callers run
/// it through the reasoning filter.
pub struct BoxLlmProvider {
    transport: Box<dyn ErasedProvider>,
}

impl BoxLlmProvider {
    pub fn new<P: LlmProvider + 'static>(transport: P) -> Self {
        debug!(
            transport = LlmProvider::name(&transport),
            native_thinking = LlmProvider::capabilities(&transport).native_thinking,
            "transport selected"
        );
        Self {
            transport: Box::new(transport),
        }
    }

    pub fn name(&self) -> &str {
        self.transport.name()
    }

    pub fn capabilities(&self) -> &ProviderCapabilities {
        self.transport.capabilities()
    }

    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        self.transport.complete_erased(request).await
    }

    pub fn stream(&self, request: CompletionRequest) -> RawEventStream {
        self.transport.stream_erased(request)
    }
}

impl fmt::Debug for BoxLlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let caps = self.capabilities();
        f.debug_struct("BoxLlmProvider")
            .field("transport", &self.name())
            .field("streaming", &caps.streaming)
            .field("native_thinking", &caps.native_thinking)
            .finish()
    }
}
