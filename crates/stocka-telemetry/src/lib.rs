//! Telemetry for the agent function-calling layer
//!
//! Two concerns live here: the in-memory performance monitor that every
//! executed call reports to, and the cost accountant that prices token
//! usage and appends usage rows to durable storage. Neither is ever allowed
//! to abort the primary request path.

pub mod cost;
pub mod monitor;

pub use cost::{
    calculate_cost, estimate_operation_cost, rate_for, CostEstimate, CostTracker, ModelRate,
    UsageLogOutcome, UsageStore,
};
pub use monitor::{MonitorConfig, QueryMonitor};
