//! Token-cost accounting
//!
//! Normalizes provider token reporting, prices it against a static
//! per-model rate table, and appends one usage row per model invocation.
//! Persistence failures are reduced to an outcome value; telemetry must
//! never abort the surrounding model-call pipeline.

use async_trait::async_trait;
use std::sync::Arc;
use stocka_types::{OperationType, RawUsage, TokenUsage, UsageRecord};
use tracing::{debug, warn};
use uuid::Uuid;

/// Price per 1,000 tokens for one model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRate {
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

/// Static pricing table. Exact model-name match first, then prefix match in
/// either direction, then the `unknown` fallback.
const PRICING: &[(&str, ModelRate)] = &[
    (
        "gpt-4o",
        ModelRate {
            prompt_per_1k: 0.0025,
            completion_per_1k: 0.01,
        },
    ),
    (
        "gpt-4o-mini",
        ModelRate {
            prompt_per_1k: 0.00015,
            completion_per_1k: 0.0006,
        },
    ),
    (
        "gpt-4-turbo",
        ModelRate {
            prompt_per_1k: 0.01,
            completion_per_1k: 0.03,
        },
    ),
    (
        "gpt-3.5-turbo",
        ModelRate {
            prompt_per_1k: 0.0005,
            completion_per_1k: 0.0015,
        },
    ),
    (
        "o1-mini",
        ModelRate {
            prompt_per_1k: 0.003,
            completion_per_1k: 0.012,
        },
    ),
    (
        "claude-3-5-sonnet",
        ModelRate {
            prompt_per_1k: 0.003,
            completion_per_1k: 0.015,
        },
    ),
    (
        "claude-3-5-haiku",
        ModelRate {
            prompt_per_1k: 0.0008,
            completion_per_1k: 0.004,
        },
    ),
    (
        "claude-3-opus",
        ModelRate {
            prompt_per_1k: 0.015,
            completion_per_1k: 0.075,
        },
    ),
    (
        "claude-3-haiku",
        ModelRate {
            prompt_per_1k: 0.00025,
            completion_per_1k: 0.00125,
        },
    ),
];

/// Rate applied when no table entry matches
const UNKNOWN_RATE: ModelRate = ModelRate {
    prompt_per_1k: 0.001,
    completion_per_1k: 0.002,
};

/// Resolve the rate for a model name
pub fn rate_for(model: &str) -> ModelRate {
    if let Some((_, rate)) = PRICING.iter().find(|(name, _)| *name == model) {
        return *rate;
    }
    // Versioned names like "gpt-4o-mini-2024-07-18" prefix-match a family;
    // the longest matching family wins so "gpt-4o-mini" beats "gpt-4o".
    let mut best: Option<(&str, ModelRate)> = None;
    for (name, rate) in PRICING {
        if model.starts_with(name) || name.starts_with(model) {
            match best {
                Some((best_name, _)) if best_name.len() >= name.len() => {}
                _ => best = Some((name, *rate)),
            }
        }
    }
    if let Some((matched, rate)) = best {
        debug!(model, matched, "prefix-matched model pricing");
        return rate;
    }
    warn!(model, "no pricing entry for model, using unknown rate");
    UNKNOWN_RATE
}

/// Round to six decimal places, the persistence precision for cost columns
fn round_cost(cost: f64) -> f64 {
    (cost * 1_000_000.0).round() / 1_000_000.0
}

/// Estimated monetary cost of one invocation
pub fn calculate_cost(model: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
    let rate = rate_for(model);
    let cost = (prompt_tokens as f64 / 1000.0) * rate.prompt_per_1k
        + (completion_tokens as f64 / 1000.0) * rate.completion_per_1k;
    round_cost(cost)
}

/// Itemized cost estimate for an operation
#[derive(Debug, Clone, serde::Serialize)]
pub struct CostEstimate {
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub prompt_cost: f64,
    pub completion_cost: f64,
    pub total_cost: f64,
}

/// Per-component cost breakdown for an operation
pub fn estimate_operation_cost(
    model: &str,
    prompt_tokens: u64,
    completion_tokens: u64,
) -> CostEstimate {
    let rate = rate_for(model);
    let prompt_cost = round_cost((prompt_tokens as f64 / 1000.0) * rate.prompt_per_1k);
    let completion_cost = round_cost((completion_tokens as f64 / 1000.0) * rate.completion_per_1k);
    CostEstimate {
        model: model.to_string(),
        prompt_tokens,
        completion_tokens,
        prompt_cost,
        completion_cost,
        total_cost: round_cost(prompt_cost + completion_cost),
    }
}

/// Append-only durable storage for usage rows; the store itself is an
/// external collaborator
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn append(&self, record: &UsageRecord) -> anyhow::Result<()>;
}

/// Result of a usage-logging attempt. Storage failures land here instead of
/// propagating to the caller.
#[derive(Debug, Clone)]
pub struct UsageLogOutcome {
    pub success: bool,
    pub record_id: Option<Uuid>,
    pub error: Option<String>,
}

/// Prices usage and appends rows through a [`UsageStore`]
pub struct CostTracker {
    store: Arc<dyn UsageStore>,
}

impl CostTracker {
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self { store }
    }

    /// Price and persist one invocation's usage
    #[allow(clippy::too_many_arguments)]
    pub async fn log_usage(
        &self,
        provider_id: Option<String>,
        agent_id: Option<String>,
        model: &str,
        usage: TokenUsage,
        duration_ms: u64,
        operation_type: OperationType,
        success: bool,
        error_type: Option<String>,
    ) -> UsageLogOutcome {
        let record = UsageRecord {
            id: Uuid::new_v4(),
            provider_id,
            agent_id,
            model_used: model.to_string(),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            estimated_cost: calculate_cost(model, usage.prompt_tokens, usage.completion_tokens),
            duration_ms,
            operation_type,
            success,
            error_type,
            timestamp: chrono::Utc::now(),
        };

        match self.store.append(&record).await {
            Ok(()) => UsageLogOutcome {
                success: true,
                record_id: Some(record.id),
                error: None,
            },
            Err(e) => {
                warn!(error = %e, model, "failed to persist usage record");
                UsageLogOutcome {
                    success: false,
                    record_id: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Normalize a provider-reported usage shape, then price and persist it
    #[allow(clippy::too_many_arguments)]
    pub async fn log_from_response(
        &self,
        provider_id: Option<String>,
        agent_id: Option<String>,
        model: &str,
        raw: &RawUsage,
        duration_ms: u64,
        operation_type: OperationType,
        success: bool,
        error_type: Option<String>,
    ) -> UsageLogOutcome {
        self.log_usage(
            provider_id,
            agent_id,
            model,
            raw.normalize(),
            duration_ms,
            operation_type,
            success,
            error_type,
        )
        .await
    }
}
