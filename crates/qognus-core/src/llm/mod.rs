//! LLM transport abstractions for the copilot.
//!
//! - `LlmProvider`: RPITIT trait for concrete transports
//! - `BoxLlmProvider`: object-safe wrapper for dynamic dispatch

pub mod box_provider;
pub mod provider;
