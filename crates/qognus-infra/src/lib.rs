//! Infrastructure layer for the Qognus copilot.
//!
//! Concrete LLM transports (Ollama NDJSON, OpenAI-compatible SSE) behind the
//! `LlmProvider` trait from `qognus-core`, and the TOML config loader.

pub mod config;
pub mod llm;
