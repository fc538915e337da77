//! Core types, config, errors, audio payloads, and the pipeline event protocol.

pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod types;
