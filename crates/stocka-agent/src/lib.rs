//! Agent orchestration layer
//!
//! Composes the provider resolver, the function registry, the result cache
//! and the telemetry subsystems into per-turn chat operations for the
//! inventory assistant.

pub mod context;
pub mod error;
pub mod service;

pub use context::build_system_prompt;
pub use error::AgentError;
pub use service::{AgentReply, AgentService, FoldedReply};
