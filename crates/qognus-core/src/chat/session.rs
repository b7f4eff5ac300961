//! Per-surface copilot conversation state.
//!
//! A `CopilotSession` owns the visible conversation history for one chat
//! surface. Hidden reasoning never enters the history: only the filtered
//! answer is recorded, so it is never replayed to the model either.

use tracing::debug;

use qognus_types::config::CopilotConfig;
use qognus_types::error::ConfigError;
use qognus_types::llm::{CompletionRequest, Message, MessageRole};

use crate::reasoning::MarkerPair;
use crate::registry::Disposable;

use super::prompt::default_system_prompt;

/// Identifies one turn within a session.
///
/// Returned by [`CopilotSession::begin_turn`]; completing or aborting with a
/// stale id is a no-op, so an overlapped turn cannot write into a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TurnId(u64);

/// Conversation state for one copilot surface.
#[derive(Debug, Clone)]
pub struct CopilotSession {
    history: Vec<Message>,
    system_prompt: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    markers: MarkerPair,
    next_turn: u64,
    /// Set between `begin_turn` and `complete_turn`/`abort_turn`.
    open_turn: Option<TurnId>,
}

impl CopilotSession {
    /// Create an empty session using the built-in system prompt.
    pub fn new(model: impl Into<String>, markers: MarkerPair) -> Self {
        Self {
            history: Vec::new(),
            system_prompt: default_system_prompt(&markers),
            model: model.into(),
            max_tokens: 1024,
            temperature: 0.3,
            markers,
            next_turn: 0,
            open_turn: None,
        }
    }

    /// Create a session from the loaded configuration.
    ///
    /// Fails if the configured marker pair is invalid.
    pub fn from_config(config: &CopilotConfig) -> Result<Self, ConfigError> {
        let markers = MarkerPair::new(&config.open_marker, &config.close_marker)
            .map_err(|e| ConfigError::InvalidMarkers(e.to_string()))?;
        let mut session = Self::new(config.model.clone(), markers)
            .with_max_tokens(config.max_tokens)
            .with_temperature(config.temperature);
        if let Some(prompt) = &config.system_prompt {
            session = session.with_system_prompt(prompt.clone());
        }
        Ok(session)
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn markers(&self) -> &MarkerPair {
        &self.markers
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Build a streaming request: system prompt, history, then the new
    /// user message. Does not modify the session.
    pub fn build_request(&self, user_message: &str) -> CompletionRequest {
        let mut messages = self.history.clone();
        messages.push(Message::user(user_message));
        self.request_for(messages)
    }

    /// Record the user message and return the request for this turn.
    ///
    /// A turn left open by a dropped or overlapped stream is rolled back
    /// first so the history keeps alternating user/assistant.
    pub fn begin_turn(&mut self, user_message: &str) -> (TurnId, CompletionRequest) {
        if let Some(stale) = self.open_turn {
            debug!(turn = stale.0, "previous turn never completed; rolling it back");
            self.abort_turn(stale);
        }
        let request = self.build_request(user_message);
        self.history.push(Message::user(user_message));

        self.next_turn += 1;
        let turn = TurnId(self.next_turn);
        self.open_turn = Some(turn);
        (turn, request)
    }

    /// Record the visible answer for `turn`.
    ///
    /// Returns `false` and leaves the history alone if `turn` is no longer
    /// the open turn.
    pub fn complete_turn(&mut self, turn: TurnId, visible_answer: impl Into<String>) -> bool {
        if self.open_turn != Some(turn) {
            debug!(turn = turn.0, "answer for a turn that is not open; dropping it");
            return false;
        }
        self.history.push(Message::assistant(visible_answer));
        self.open_turn = None;
        true
    }

    /// Drop the user message of `turn` after a transport error.
    pub fn abort_turn(&mut self, turn: TurnId) -> bool {
        if self.open_turn != Some(turn) {
            return false;
        }
        if matches!(self.history.last(), Some(m) if m.role == MessageRole::User) {
            self.history.pop();
        }
        self.open_turn = None;
        true
    }

    /// Forget the conversation, keeping prompt and model settings.
    pub fn clear(&mut self) {
        self.history.clear();
        self.open_turn = None;
    }

    fn request_for(&self, messages: Vec<Message>) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages,
            system: Some(self.system_prompt.clone()),
            max_tokens: self.max_tokens,
            temperature: Some(self.temperature),
            stream: true,
            stop_sequences: None,
        }
    }
}

impl Disposable for CopilotSession {
    fn dispose(&mut self) {
        debug!(
            model = %self.model,
            messages = self.history.len(),
            "copilot session disposed"
        );
        self.clear();
    }
}
