//! Telemetry record types shared across the workspace
//!
//! These are designed to be database-friendly (JSON serializable, flat
//! fields) and are the single source of truth for what the performance
//! monitor and the cost accountant persist or aggregate.

use crate::functions::FunctionName;
use crate::provider::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// One executed function call, hit or miss, success or failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPerformanceRecord {
    /// Unique record identifier
    pub id: Uuid,
    /// Which catalogue function ran
    pub function_name: FunctionName,
    /// The bound positional arguments, JSON-serialized
    pub parameters: serde_json::Value,
    /// Wall-clock duration of the call
    pub execution_time_ms: u64,
    /// Whether the result came from the cache
    pub cache_hit: bool,
    /// Approximate result size (array length, key count, string length, or 1)
    pub result_size: u64,
    /// Whether the call produced a result
    pub success: bool,
    /// Error text for failed calls
    pub error_text: Option<String>,
    /// Agent that triggered the call, when known
    pub agent_id: Option<String>,
    /// When the call completed
    pub timestamp: DateTime<Utc>,
}

impl QueryPerformanceRecord {
    /// Build a record for a call that just completed
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        function_name: FunctionName,
        parameters: serde_json::Value,
        execution_time_ms: u64,
        cache_hit: bool,
        result_size: u64,
        success: bool,
        error_text: Option<String>,
        agent_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            function_name,
            parameters,
            execution_time_ms,
            cache_hit,
            result_size,
            success,
            error_text,
            agent_id,
            timestamp: Utc::now(),
        }
    }
}

/// Per-function usage counts within an agent summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionUsage {
    pub function_name: FunctionName,
    pub count: u64,
    pub avg_time_ms: f64,
}

/// Rolling per-agent statistics, recomputed incrementally on each record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPerformanceSummary {
    pub agent_id: String,
    pub total_queries: u64,
    pub successful_queries: u64,
    /// Incremental mean over all of the agent's records
    pub average_response_time_ms: f64,
    /// Windowed ratio over the agent's most recent 50 records
    pub cache_hit_rate: f64,
    pub failure_rate: f64,
    /// Top functions by call count, at most 10 entries
    pub top_functions: Vec<FunctionUsage>,
}

impl AgentPerformanceSummary {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            total_queries: 0,
            successful_queries: 0,
            average_response_time_ms: 0.0,
            cache_hit_rate: 0.0,
            failure_rate: 0.0,
            top_functions: Vec::new(),
        }
    }
}

/// Whole-process performance totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_queries: u64,
    pub successful_queries: u64,
    pub cache_hits: u64,
    pub average_response_time_ms: f64,
    /// Agents with at least one record
    pub agent_count: usize,
}

/// Kind of an advisory performance alert
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    /// A recent query exceeded the slow-query threshold
    SlowQuery,
    /// An agent's failure rate crossed the alert threshold
    HighFailureRate,
    /// An agent's cache hit rate is below the alert threshold
    LowCacheHitRate,
}

/// Advisory signal computed on demand from the performance log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceAlert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub agent_id: Option<String>,
}

/// What kind of model invocation a usage record accounts for
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    /// A chat completion round-trip
    #[strum(serialize = "chat")]
    Chat,
    /// A vision/image analysis request
    #[strum(serialize = "image_analysis")]
    ImageAnalysis,
    /// A connectivity or capability probe
    #[strum(serialize = "connection_test")]
    ConnectionTest,
}

/// One row appended per model invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub provider_id: Option<String>,
    pub agent_id: Option<String>,
    pub model_used: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost: f64,
    pub duration_ms: u64,
    pub operation_type: OperationType,
    pub success: bool,
    pub error_type: Option<String>,
    pub timestamp: DateTime<Utc>,
}
