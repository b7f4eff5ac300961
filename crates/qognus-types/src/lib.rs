//! Shared domain types for the Qognus copilot.
//!
//! LLM request/response/stream types, the known non-streaming response
//! shapes, configuration, and error types.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, thiserror.

pub mod config;
pub mod error;
pub mod llm;
pub mod response;
