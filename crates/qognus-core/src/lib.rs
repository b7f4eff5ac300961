//! Core logic for the Qognus copilot.
//!
//! The streaming reasoning filter, the LLM transport traits that the
//! infrastructure layer implements, the per-surface handle registry, and
//! the copilot chat service. Depends only on `qognus-types` -- never on
//! `qognus-infra` or any network crate.

pub mod chat;
pub mod llm;
pub mod reasoning;
pub mod registry;
