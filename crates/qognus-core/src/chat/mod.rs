//! Copilot conversation handling.
//!
//! `CopilotSession` holds per-surface history; `service` runs turns against
//! a provider and filters the reasoning out of the response.

pub mod prompt;
pub mod service;
pub mod session;

pub use service::{complete_once, run_turn};
pub use session::{CopilotSession, TurnId};
