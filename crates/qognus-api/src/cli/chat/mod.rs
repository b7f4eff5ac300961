//! Interactive CLI chat with the copilot.
//!
//! Streams visible answers with a thinking spinner, renders history as
//! markdown, and supports slash commands. Entry point:
//! `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
