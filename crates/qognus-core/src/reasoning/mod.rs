//! Separation of hidden model reasoning from the visible answer.
//!
//! - `ReasoningFilter`: incremental, chunk-invariant marker filter
//! - `filter_stream`: applies a filter to a provider event stream

pub mod filter;
pub mod stream;

pub use filter::{MarkerPair, ReasoningFilter, StreamState};
pub use stream::{EventStream, filter_stream};
