//! HTTP gateway for the hot-topic workflow.
//!
//! Serves `/health`, the streaming `/workflow` endpoint and, optionally, the
//! embedded browser UI. Every workflow request resolves its runner from the
//! [`WorkflowRegistry`](hot_topic_workflow::WorkflowRegistry) held in
//! [`GatewayState`] and relays the run's events as NDJSON.

pub mod relay;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{build_router, serve, start_gateway};
pub use state::GatewayState;
