//! Registry dispatch: cache consult, execution, telemetry, rendering

use crate::error::FunctionCallError;
use crate::format;
use crate::parser::parse_directive;
use crate::reader::InventoryReader;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use stocka_cache::ResultCache;
use stocka_telemetry::QueryMonitor;
use stocka_types::{FunctionCall, FunctionName, QueryPerformanceRecord};
use tracing::{debug, instrument, warn};

/// Registry tuning knobs
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Results are cached only when execution took longer than this;
    /// trivially cheap calls are not worth the cache churn.
    pub cache_threshold_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cache_threshold_ms: 50,
        }
    }
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_threshold_ms(mut self, threshold_ms: u64) -> Self {
        self.cache_threshold_ms = threshold_ms;
        self
    }
}

/// Result of handing a model response to the registry
#[derive(Debug, Clone)]
pub struct FunctionCallOutcome {
    /// Whether the response contained a call directive
    pub has_function: bool,
    /// Raw result value for successful calls
    pub result: Option<Value>,
    /// Rendered user-facing summary for successful calls
    pub formatted_response: Option<String>,
    /// Recovered parse or execution failure
    pub error: Option<String>,
}

impl FunctionCallOutcome {
    fn no_function() -> Self {
        Self {
            has_function: false,
            result: None,
            formatted_response: None,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            has_function: true,
            result: None,
            formatted_response: None,
            error: Some(error.into()),
        }
    }

    fn succeeded(result: Value, formatted_response: String) -> Self {
        Self {
            has_function: true,
            result: Some(result),
            formatted_response: Some(formatted_response),
            error: None,
        }
    }
}

/// The function registry: parses directives, executes catalogue queries
/// through the cache, and reports every call to the monitor
pub struct FunctionRegistry {
    reader: Arc<dyn InventoryReader>,
    cache: Arc<ResultCache>,
    monitor: Arc<QueryMonitor>,
    config: RegistryConfig,
}

impl FunctionRegistry {
    pub fn new(
        reader: Arc<dyn InventoryReader>,
        cache: Arc<ResultCache>,
        monitor: Arc<QueryMonitor>,
        config: RegistryConfig,
    ) -> Self {
        // Invalidation lists are hand-maintained; surface any catalogue
        // function a write path cannot purge.
        ResultCache::warn_on_coverage_gaps();
        Self {
            reader,
            cache,
            monitor,
            config,
        }
    }

    /// Model-facing catalogue listing for system prompts
    pub fn catalog_text(&self) -> String {
        FunctionName::all()
            .iter()
            .map(|f| format!("- {}: {}", f.signature(), f.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Find and run the call directive in a model response, if any
    #[instrument(skip(self, model_text), fields(agent_id = agent_id.unwrap_or("-")))]
    pub async fn parse_and_execute(
        &self,
        model_text: &str,
        agent_id: Option<&str>,
    ) -> FunctionCallOutcome {
        match parse_directive(model_text) {
            None => FunctionCallOutcome::no_function(),
            Some(Err(e)) => {
                debug!(error = %e, "directive rejected before execution");
                FunctionCallOutcome::failed(e.to_string())
            }
            Some(Ok(call)) => self.execute_call(&call, agent_id).await,
        }
    }

    /// Execute a validated call: cache consult, dispatch, telemetry, render
    pub async fn execute_call(
        &self,
        call: &FunctionCall,
        agent_id: Option<&str>,
    ) -> FunctionCallOutcome {
        let started = Instant::now();
        let params_json = serde_json::to_value(&call.args).unwrap_or(Value::Null);

        if let Some(hit) = self.cache.get(call.name, &call.args).await {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            self.report(call, &params_json, elapsed_ms, true, &hit, None, agent_id)
                .await;
            let formatted = format::render(call.name, &hit);
            return FunctionCallOutcome::succeeded(hit, formatted);
        }

        match self.dispatch(call).await {
            Ok(value) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                if elapsed_ms > self.config.cache_threshold_ms {
                    self.cache.set(call.name, &call.args, value.clone()).await;
                }
                self.report(call, &params_json, elapsed_ms, false, &value, None, agent_id)
                    .await;
                let formatted = format::render(call.name, &value);
                FunctionCallOutcome::succeeded(value, formatted)
            }
            Err(e) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(function = %call.name, error = %e, "function execution failed");
                self.report(
                    call,
                    &params_json,
                    elapsed_ms,
                    false,
                    &Value::Null,
                    Some(e.to_string()),
                    agent_id,
                )
                .await;
                FunctionCallOutcome::failed(e.to_string())
            }
        }
    }

    /// Route a validated call to its data-store read function
    async fn dispatch(&self, call: &FunctionCall) -> Result<Value, FunctionCallError> {
        let to_exec_err = |e: anyhow::Error| FunctionCallError::Execution {
            function: call.name,
            message: e.to_string(),
        };
        let serialize = |v: Result<Value, serde_json::Error>| {
            v.map_err(|e| FunctionCallError::Execution {
                function: call.name,
                message: e.to_string(),
            })
        };

        match call.name {
            FunctionName::SearchProducts => {
                let query = call.text_arg(0).unwrap_or_default();
                let rows = self.reader.search_products(query).await.map_err(to_exec_err)?;
                serialize(serde_json::to_value(rows))
            }
            FunctionName::GetProductsByCategory => {
                let category = call.text_arg(0).unwrap_or_default();
                let rows = self
                    .reader
                    .products_by_category(category)
                    .await
                    .map_err(to_exec_err)?;
                serialize(serde_json::to_value(rows))
            }
            FunctionName::GetProductBySku => {
                let sku = call.text_arg(0).unwrap_or_default();
                let row = self.reader.product_by_sku(sku).await.map_err(to_exec_err)?;
                serialize(serde_json::to_value(row))
            }
            FunctionName::GetLowStockItems => {
                let threshold = call.number_arg(0).unwrap_or(10.0) as i64;
                let rows = self
                    .reader
                    .low_stock_items(threshold)
                    .await
                    .map_err(to_exec_err)?;
                serialize(serde_json::to_value(rows))
            }
            FunctionName::GetHighValueItems => {
                let threshold = call.number_arg(0).unwrap_or(1000.0);
                let rows = self
                    .reader
                    .high_value_items(threshold)
                    .await
                    .map_err(to_exec_err)?;
                serialize(serde_json::to_value(rows))
            }
            FunctionName::GetTotalInventoryValue => {
                let total = self.reader.total_inventory_value().await.map_err(to_exec_err)?;
                serialize(serde_json::to_value(total))
            }
            FunctionName::GetInventorySummary => {
                let summary = self.reader.inventory_summary().await.map_err(to_exec_err)?;
                serialize(serde_json::to_value(summary))
            }
            FunctionName::GetRecentTransactions => {
                let limit = call.number_arg(0).unwrap_or(10.0).max(0.0) as u32;
                let rows = self
                    .reader
                    .recent_transactions(limit)
                    .await
                    .map_err(to_exec_err)?;
                serialize(serde_json::to_value(rows))
            }
            FunctionName::GetTransactionStats => {
                let days = call.number_arg(0).unwrap_or(30.0).max(0.0) as u32;
                let stats = self
                    .reader
                    .transaction_stats(days)
                    .await
                    .map_err(to_exec_err)?;
                serialize(serde_json::to_value(stats))
            }
            FunctionName::GetWarehouseOccupancy => {
                let occupancy = self
                    .reader
                    .warehouse_occupancy()
                    .await
                    .map_err(to_exec_err)?;
                serialize(serde_json::to_value(occupancy))
            }
        }
    }

    /// Approximate result size: array length, object key count, string
    /// length, or 1 for scalars
    fn result_size(value: &Value) -> u64 {
        match value {
            Value::Array(items) => items.len() as u64,
            Value::Object(map) => map.len() as u64,
            Value::String(s) => s.len() as u64,
            _ => 1,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn report(
        &self,
        call: &FunctionCall,
        params_json: &Value,
        elapsed_ms: u64,
        cache_hit: bool,
        value: &Value,
        error_text: Option<String>,
        agent_id: Option<&str>,
    ) {
        let success = error_text.is_none();
        let record = QueryPerformanceRecord::new(
            call.name,
            params_json.clone(),
            elapsed_ms,
            cache_hit,
            Self::result_size(value),
            success,
            error_text,
            agent_id.map(str::to_string),
        );
        self.monitor.log_query(record).await;
    }
}
