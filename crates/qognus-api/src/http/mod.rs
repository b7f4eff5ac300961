//! HTTP layer for the copilot.
//!
//! Axum server exposing the SSE copilot endpoint and session management
//! under `/api/v1/`, with envelope responses and CORS.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
