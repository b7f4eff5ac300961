//! Ollama LLM provider implementation.
//!
//! [`OllamaProvider`] implements
//! [`LlmProvider`](qognus_core::llm::provider::LlmProvider) for Ollama's
//! native `/api/chat` endpoint, including NDJSON streaming.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::OllamaProvider;
