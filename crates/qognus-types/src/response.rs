//! Known non-streaming response payloads.
//!
//! Each backend the copilot talks to returns assistant text in a different
//! place. Instead of searching arbitrary JSON for "the best text field",
//! every supported payload is a variant of [`ResponseShape`] with its own
//! mapping to text. Anything else is rejected with
//! [`ResponseShapeError::Unrecognized`].

use serde::Deserialize;

/// `{"message": {"role": "assistant", "content": "..."}}` from Ollama `/api/chat`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OllamaChatResponse {
    pub message: OllamaChatMessage,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OllamaChatMessage {
    pub content: String,
    #[serde(default)]
    pub thinking: Option<String>,
}

/// `{"response": "..."}` from Ollama `/api/generate`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OllamaGenerateResponse {
    pub response: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// `{"choices": [{"message": {"content": "..."}}]}` from `/chat/completions`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OpenAiChatResponse {
    pub choices: Vec<OpenAiChatChoice>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OpenAiChatChoice {
    pub message: OpenAiChatMessage,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OpenAiChatMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// `{"choices": [{"text": "..."}]}` from the legacy `/completions` endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OpenAiCompletionResponse {
    pub choices: Vec<OpenAiCompletionChoice>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OpenAiCompletionChoice {
    pub text: String,
}

/// The closed set of response payloads the copilot understands.
///
/// Variant order is the match order: the first payload layout that
/// deserializes wins.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ResponseShape {
    OllamaChat(OllamaChatResponse),
    OllamaGenerate(OllamaGenerateResponse),
    OpenAiChat(OpenAiChatResponse),
    OpenAiCompletion(OpenAiCompletionResponse),
}

/// Errors from mapping a response payload to assistant text.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResponseShapeError {
    #[error("unrecognized response shape: {0}")]
    Unrecognized(String),

    #[error("{shape} response carried no assistant text")]
    Empty { shape: &'static str },
}

impl ResponseShape {
    /// Parse a JSON body into one of the known shapes.
    pub fn parse(body: &str) -> Result<Self, ResponseShapeError> {
        serde_json::from_str(body).map_err(|e| ResponseShapeError::Unrecognized(e.to_string()))
    }

    /// Short name of the variant, for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseShape::OllamaChat(_) => "ollama_chat",
            ResponseShape::OllamaGenerate(_) => "ollama_generate",
            ResponseShape::OpenAiChat(_) => "openai_chat",
            ResponseShape::OpenAiCompletion(_) => "openai_completion",
        }
    }

    /// The model name reported by the backend, if any.
    pub fn model(&self) -> Option<&str> {
        match self {
            ResponseShape::OllamaChat(r) => r.model.as_deref(),
            ResponseShape::OllamaGenerate(r) => r.model.as_deref(),
            ResponseShape::OpenAiChat(r) => r.model.as_deref(),
            ResponseShape::OpenAiCompletion(r) => r.model.as_deref(),
        }
    }

    /// Extract the raw assistant text.
    ///
    /// Only the first choice is used for the OpenAI shapes.
    pub fn into_text(self) -> Result<String, ResponseShapeError> {
        let kind = self.kind();
        match self {
            ResponseShape::OllamaChat(r) => Ok(r.message.content),
            ResponseShape::OllamaGenerate(r) => Ok(r.response),
            ResponseShape::OpenAiChat(r) => r
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or(ResponseShapeError::Empty { shape: kind }),
            ResponseShape::OpenAiCompletion(r) => r
                .choices
                .into_iter()
                .next()
                .map(|c| c.text)
                .ok_or(ResponseShapeError::Empty { shape: kind }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ollama_chat() {
        let body = r#"{"model":"qwen3:latest","message":{"role":"assistant","content":"Hi"},"done":true}"#;
        let shape = ResponseShape::parse(body).unwrap();
        assert_eq!(shape.kind(), "ollama_chat");
        assert_eq!(shape.model(), Some("qwen3:latest"));
        assert_eq!(shape.into_text().unwrap(), "Hi");
    }

    #[test]
    fn parses_ollama_generate() {
        let body = r#"{"model":"phi3:medium","response":"<think>x</think>Done","done":true}"#;
        let shape = ResponseShape::parse(body).unwrap();
        assert_eq!(shape.kind(), "ollama_generate");
        assert_eq!(shape.into_text().unwrap(), "<think>x</think>Done");
    }

    #[test]
    fn parses_openai_chat() {
        let body = r#"{"id":"c1","choices":[{"index":0,"message":{"role":"assistant","content":"Answer"}}]}"#;
        let shape = ResponseShape::parse(body).unwrap();
        assert_eq!(shape.kind(), "openai_chat");
        assert_eq!(shape.into_text().unwrap(), "Answer");
    }

    #[test]
    fn parses_openai_completion() {
        let body = r#"{"choices":[{"index":0,"text":"legacy"}]}"#;
        let shape = ResponseShape::parse(body).unwrap();
        assert_eq!(shape.kind(), "openai_completion");
        assert_eq!(shape.into_text().unwrap(), "legacy");
    }

    #[test]
    fn openai_chat_without_choices_is_empty() {
        let shape = ResponseShape::parse(r#"{"choices":[]}"#).unwrap();
        assert_eq!(
            shape.into_text().unwrap_err(),
            ResponseShapeError::Empty {
                shape: "openai_chat"
            }
        );
    }

    #[test]
    fn openai_chat_with_null_content_is_empty() {
        let body = r#"{"choices":[{"message":{"content":null}}]}"#;
        let shape = ResponseShape::parse(body).unwrap();
        assert!(matches!(
            shape.into_text(),
            Err(ResponseShapeError::Empty { .. })
        ));
    }

    #[test]
    fn rejects_unknown_shapes() {
        for body in [
            r#"{"output":{"text":"guess me"}}"#,
            r#"{"data":[{"content":"nope"}]}"#,
            r#""just a string""#,
            "not json",
        ] {
            assert!(
                matches!(
                    ResponseShape::parse(body),
                    Err(ResponseShapeError::Unrecognized(_))
                ),
                "expected rejection for {body}"
            );
        }
    }
}
