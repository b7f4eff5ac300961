//! Observability setup for the Qognus binary.

pub mod tracing_setup;
