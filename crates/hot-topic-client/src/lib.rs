//! Rust consumer of the `/workflow` event stream.
//!
//! [`NdjsonDecoder`] turns arbitrary byte chunks into complete lines,
//! [`RunView`] folds events into what a user sees (status line, result text,
//! audio), and [`WorkflowClient`] drives both over HTTP.

pub mod decoder;
pub mod http;
pub mod view;

pub use decoder::NdjsonDecoder;
pub use http::WorkflowClient;
pub use view::{RunOutcome, RunView};
