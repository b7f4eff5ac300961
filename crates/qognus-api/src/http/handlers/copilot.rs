//! Copilot endpoints.
//!
//! - POST   /api/v1/copilot/stream                - SSE streaming turn
//! - GET    /api/v1/copilot/sessions              - List live surface ids
//! - DELETE /api/v1/copilot/sessions/{surface_id} - Dispose a surface's session
//!
//! SSE event types:
//! - `session`: initial event with `{ "surface_id": "..." }`
//! - `text_delta`: visible answer text `{ "text": "..." }`
//! - `usage`: token usage `{ "input_tokens": N, "output_tokens": N }`
//! - `error`: transport failure `{ "message": "..." }`
//! - `done`: stream complete `{}`
//!
//! Reasoning spans are removed before anything reaches the client.

use std::convert::Infallible;
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

use qognus_core::chat::run_turn;
use qognus_types::llm::StreamEvent;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, new_request_id};
use crate::state::AppState;

/// Request body for the streaming copilot endpoint.
#[derive(Debug, Deserialize)]
pub struct CopilotStreamRequest {
    /// Chat surface to continue; a new one is created if absent.
    pub surface_id: Option<String>,
    /// The user's question.
    pub message: String,
}

/// POST /api/v1/copilot/stream - SSE streaming copilot turn.
pub async fn stream_copilot(
    State(state): State<AppState>,
    Json(body): Json<CopilotStreamRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let message = body.message.trim().to_string();
    if message.is_empty() {
        return Err(AppError::Validation("message must not be empty".to_string()));
    }
    let surface_id = body
        .surface_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(new_request_id);

    // The registry lock only covers starting the turn; `run_turn` returns
    // an owned stream, so no await happens while it is held.
    let (turn, llm_stream) = {
        let mut sessions = state.sessions.lock().await;
        let session = sessions.get_or_try_create(&surface_id, || {
            state
                .new_session()
                .inspect(|_| info!(surface_id = %surface_id, "copilot session created"))
        })?;
        run_turn(&state.provider, session, &message)
    };

    let sessions = state.sessions.clone();

    let sse_stream = async_stream::stream! {
        let session_json = serde_json::json!({ "surface_id": surface_id });
        yield Ok::<_, Infallible>(Event::default().event("session").data(session_json.to_string()));

        let start_time = Instant::now();
        let mut full_response = String::new();
        let mut had_error = false;
        let mut llm_stream = llm_stream;

        while let Some(event_result) = llm_stream.next().await {
            match event_result {
                Ok(StreamEvent::TextDelta { text }) => {
                    let data = serde_json::json!({ "text": text });
                    yield Ok(Event::default().event("text_delta").data(data.to_string()));
                    full_response.push_str(&text);
                }
                Ok(StreamEvent::Usage(usage)) => {
                    let data = serde_json::to_string(&usage).unwrap_or_default();
                    yield Ok(Event::default().event("usage").data(data));
                }
                Ok(StreamEvent::Done) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(surface_id = %surface_id, error = %e, "copilot stream failed");
                    let data = serde_json::json!({ "message": e.to_string() });
                    yield Ok(Event::default().event("error").data(data.to_string()));
                    had_error = true;
                    break;
                }
            }
        }

        // A client that disconnects never reaches this point; the open turn
        // is rolled back by the next `begin_turn` on the same surface. If
        // another request has started a turn since, this one is stale and
        // leaves the history alone.
        if let Some(session) = sessions.lock().await.get_mut(&surface_id) {
            let recorded = if had_error {
                session.abort_turn(turn)
            } else {
                session.complete_turn(turn, full_response)
            };
            if !recorded {
                debug!(surface_id = %surface_id, "turn superseded by a newer request");
            }
        }
        debug!(
            surface_id = %surface_id,
            response_ms = start_time.elapsed().as_millis() as u64,
            "copilot turn finished"
        );

        yield Ok(Event::default().event("done").data("{}"));
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

/// GET /api/v1/copilot/sessions - List live surface ids.
pub async fn list_sessions(State(state): State<AppState>) -> Json<ApiResponse<Vec<String>>> {
    let start = Instant::now();
    let request_id = new_request_id();

    let ids = state.sessions.lock().await.ids();

    let elapsed = start.elapsed().as_millis() as u64;
    Json(ApiResponse::success(ids, request_id, elapsed))
}

/// DELETE /api/v1/copilot/sessions/{surface_id} - Dispose a surface's session.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(surface_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = new_request_id();

    if !state.sessions.lock().await.dispose(&surface_id) {
        return Err(AppError::SessionNotFound(surface_id));
    }
    info!(surface_id = %surface_id, "copilot session disposed");

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(
        serde_json::json!({ "disposed": true, "surface_id": surface_id }),
        request_id,
        elapsed,
    );

    Ok(Json(resp))
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;

    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use futures_util::stream;

    use qognus_core::llm::box_provider::BoxLlmProvider;
    use qognus_core::llm::provider::LlmProvider;
    use qognus_types::config::CopilotConfig;
    use qognus_types::llm::{
        CompletionRequest, CompletionResponse, LlmError, MessageRole, ProviderCapabilities,
        StopReason, Usage,
    };

    use super::*;

    struct ScriptedProvider {
        fragments: Vec<&'static str>,
        fail: bool,
        /// Answer "answer to <last user message>" instead of `fragments`.
        echo: bool,
        capabilities: ProviderCapabilities,
    }

    impl ScriptedProvider {
        fn new(fragments: Vec<&'static str>) -> Self {
            Self {
                fragments,
                fail: false,
                echo: false,
                capabilities: ProviderCapabilities {
                    streaming: true,
                    native_thinking: false,
                    max_context_tokens: 32_768,
                    max_output_tokens: 4096,
                },
            }
        }
    }

    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn capabilities(&self) -> &ProviderCapabilities {
            &self.capabilities
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                id: "resp-1".into(),
                content: self.fragments.concat(),
                model: request.model.clone(),
                stop_reason: StopReason::EndTurn,
                usage: Usage::default(),
            })
        }

        fn stream(
            &self,
            request: CompletionRequest,
        ) -> Pin<Box<dyn futures_util::Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>
        {
            if self.fail {
                return Box::pin(stream::iter(vec![Err(LlmError::Stream(
                    "connection reset".into(),
                ))]));
            }
            if self.echo {
                let question = request
                    .messages
                    .last()
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                return Box::pin(stream::iter(vec![
                    Ok(StreamEvent::TextDelta {
                        text: format!("<think>echo it</think>answer to {question}"),
                    }),
                    Ok(StreamEvent::Done),
                ]));
            }
            let mut events: Vec<Result<StreamEvent, LlmError>> = self
                .fragments
                .iter()
                .map(|f| Ok(StreamEvent::TextDelta { text: f.to_string() }))
                .collect();
            events.push(Ok(StreamEvent::Usage(Usage {
                input_tokens: 42,
                output_tokens: 7,
            })));
            events.push(Ok(StreamEvent::Done));
            Box::pin(stream::iter(events))
        }
    }

    fn state_with(provider: ScriptedProvider) -> AppState {
        AppState::new(CopilotConfig::default(), BoxLlmProvider::new(provider))
    }

    async fn start_stream(
        state: &AppState,
        surface_id: Option<&str>,
        message: &str,
    ) -> axum::response::Response {
        stream_copilot(
            State(state.clone()),
            Json(CopilotStreamRequest {
                surface_id: surface_id.map(str::to_string),
                message: message.to_string(),
            }),
        )
        .await
        .unwrap()
        .into_response()
    }

    async fn drain(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn sse_body(state: &AppState, surface_id: Option<&str>, message: &str) -> String {
        drain(start_stream(state, surface_id, message).await).await
    }

    #[tokio::test]
    async fn test_stream_sends_only_visible_text() {
        let state = state_with(ScriptedProvider::new(vec![
            "<thi",
            "nk>count tickets per product</th",
            "ink>FluxRouter has ",
            "the most tickets.",
        ]));

        let body = sse_body(&state, Some("grid-main"), "Which product has the most tickets?").await;

        assert!(body.contains("event: session"));
        assert!(body.contains("grid-main"));
        assert!(body.contains("event: text_delta"));
        assert!(body.contains("event: usage"));
        assert!(body.contains("event: done"));
        assert!(!body.contains("count tickets"));
        assert!(!body.contains("think"));

        let sessions = state.sessions.lock().await;
        let history = sessions.get("grid-main").unwrap().history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[1].content, "FluxRouter has the most tickets.");
    }

    #[tokio::test]
    async fn test_stream_error_rolls_back_turn() {
        let state = state_with(ScriptedProvider {
            fail: true,
            ..ScriptedProvider::new(vec![])
        });

        let body = sse_body(&state, Some("grid-main"), "hello").await;

        assert!(body.contains("event: error"));
        assert!(body.contains("connection reset"));
        assert!(body.contains("event: done"));

        let sessions = state.sessions.lock().await;
        assert!(sessions.get("grid-main").unwrap().history().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_streams_keep_answers_with_their_questions() {
        let state = state_with(ScriptedProvider {
            echo: true,
            ..ScriptedProvider::new(vec![])
        });

        // Both turns start before either stream is read.
        let first = start_stream(&state, Some("grid-main"), "A").await;
        let second = start_stream(&state, Some("grid-main"), "B").await;

        let first_body = drain(first).await;
        let second_body = drain(second).await;
        assert!(first_body.contains("answer to A"));
        assert!(second_body.contains("answer to B"));

        let sessions = state.sessions.lock().await;
        let history: Vec<(MessageRole, &str)> = sessions
            .get("grid-main")
            .unwrap()
            .history()
            .iter()
            .map(|m| (m.role.clone(), m.content.as_str()))
            .collect();
        assert_eq!(
            history,
            vec![
                (MessageRole::User, "B"),
                (MessageRole::Assistant, "answer to B"),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_with_bad_markers_creates_no_session() {
        let config = CopilotConfig {
            open_marker: String::new(),
            ..CopilotConfig::default()
        };
        let state = AppState::new(config, BoxLlmProvider::new(ScriptedProvider::new(vec![])));
        let result = stream_copilot(
            State(state.clone()),
            Json(CopilotStreamRequest {
                surface_id: Some("grid-main".to_string()),
                message: "hi".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Config(_))));
        assert!(state.sessions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_stream_without_surface_id_creates_one() {
        let state = state_with(ScriptedProvider::new(vec!["ok"]));
        sse_body(&state, None, "hi").await;
        assert_eq!(state.sessions.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_stream_rejects_empty_message() {
        let state = state_with(ScriptedProvider::new(vec![]));
        let result = stream_copilot(
            State(state.clone()),
            Json(CopilotStreamRequest {
                surface_id: None,
                message: "   ".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(state.sessions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_and_delete_sessions() {
        let state = state_with(ScriptedProvider::new(vec!["ok"]));
        sse_body(&state, Some("tickets-panel"), "hi").await;
        sse_body(&state, Some("clusters-panel"), "hi").await;

        let Json(listed) = list_sessions(State(state.clone())).await;
        assert_eq!(
            listed.data.unwrap(),
            vec!["clusters-panel".to_string(), "tickets-panel".to_string()]
        );

        let Json(deleted) = delete_session(State(state.clone()), Path("tickets-panel".to_string()))
            .await
            .unwrap();
        assert_eq!(deleted.data.unwrap()["disposed"], true);
        assert_eq!(state.sessions.lock().await.ids(), vec!["clusters-panel".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_unknown_session_is_404() {
        let state = state_with(ScriptedProvider::new(vec![]));
        let err = delete_session(State(state), Path("nope".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
