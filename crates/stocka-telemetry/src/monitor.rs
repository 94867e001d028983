//! Query performance monitor
//!
//! Keeps a bounded, time-ordered log of executed calls and rolling
//! per-agent aggregates. Response-time means are updated incrementally so
//! no history rescan is needed; cache-hit rate is a true windowed ratio
//! over an agent's most recent 50 records; alerts are computed on demand
//! and are advisory only.

use std::collections::{HashMap, VecDeque};
use stocka_types::{
    AgentPerformanceSummary, AlertKind, FunctionName, FunctionUsage, PerformanceAlert,
    PerformanceSummary, QueryPerformanceRecord, Severity,
};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Monitor thresholds; defaults match the production alerting policy
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Retained record ceiling; oldest records are trimmed past this
    pub max_records: usize,
    /// Execution time that qualifies a query as slow
    pub slow_query_ms: u64,
    /// Failure-rate percentage that raises an agent alert
    pub failure_rate_threshold: f64,
    /// Cache-hit-rate percentage below which an agent alert is raised
    pub hit_rate_threshold: f64,
    /// Window size for the hit-rate computation
    pub hit_rate_window: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_records: 1000,
            slow_query_ms: 2000,
            failure_rate_threshold: 20.0,
            hit_rate_threshold: 30.0,
            hit_rate_window: 50,
        }
    }
}

/// Running per-function totals inside an agent aggregate
#[derive(Debug, Clone, Default)]
struct FunctionAggregate {
    count: u64,
    total_time_ms: u64,
}

/// Incrementally maintained per-agent totals
#[derive(Debug, Clone, Default)]
struct AgentAggregate {
    total_queries: u64,
    successful_queries: u64,
    average_response_time_ms: f64,
    functions: HashMap<FunctionName, FunctionAggregate>,
}

impl AgentAggregate {
    /// Fold one record in; `new_avg = (old_avg * (n - 1) + x) / n`
    fn apply(&mut self, record: &QueryPerformanceRecord) {
        self.total_queries += 1;
        if record.success {
            self.successful_queries += 1;
        }
        let n = self.total_queries as f64;
        self.average_response_time_ms =
            (self.average_response_time_ms * (n - 1.0) + record.execution_time_ms as f64) / n;

        let entry = self.functions.entry(record.function_name).or_default();
        entry.count += 1;
        entry.total_time_ms += record.execution_time_ms;
    }

    fn failure_rate(&self) -> f64 {
        if self.total_queries == 0 {
            0.0
        } else {
            (self.total_queries - self.successful_queries) as f64 / self.total_queries as f64
                * 100.0
        }
    }

    /// Top functions by call count, at most 10, re-sorted on demand
    fn top_functions(&self) -> Vec<FunctionUsage> {
        let mut usage: Vec<FunctionUsage> = self
            .functions
            .iter()
            .map(|(name, agg)| FunctionUsage {
                function_name: *name,
                count: agg.count,
                avg_time_ms: agg.total_time_ms as f64 / agg.count as f64,
            })
            .collect();
        usage.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.function_name.as_str().cmp(b.function_name.as_str()))
        });
        usage.truncate(10);
        usage
    }
}

#[derive(Debug, Default)]
struct MonitorState {
    records: VecDeque<QueryPerformanceRecord>,
    agents: HashMap<String, AgentAggregate>,
}

/// The append-only performance log with rolling aggregates
pub struct QueryMonitor {
    state: RwLock<MonitorState>,
    config: MonitorConfig,
}

impl QueryMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            state: RwLock::new(MonitorState::default()),
            config,
        }
    }

    /// Append one record, trimming oldest-first past the ceiling
    pub async fn log_query(&self, record: QueryPerformanceRecord) -> Uuid {
        let id = record.id;
        let mut state = self.state.write().await;

        if let Some(agent_id) = record.agent_id.clone() {
            state.agents.entry(agent_id).or_default().apply(&record);
        }

        state.records.push_back(record);
        while state.records.len() > self.config.max_records {
            state.records.pop_front();
        }
        debug!(%id, retained = state.records.len(), "logged query record");
        id
    }

    /// Whole-process totals over the retained log
    pub async fn performance_summary(&self) -> PerformanceSummary {
        let state = self.state.read().await;
        let total = state.records.len() as u64;
        let successful = state.records.iter().filter(|r| r.success).count() as u64;
        let hits = state.records.iter().filter(|r| r.cache_hit).count() as u64;
        let avg = if total == 0 {
            0.0
        } else {
            state
                .records
                .iter()
                .map(|r| r.execution_time_ms as f64)
                .sum::<f64>()
                / total as f64
        };
        PerformanceSummary {
            total_queries: total,
            successful_queries: successful,
            cache_hits: hits,
            average_response_time_ms: avg,
            agent_count: state.agents.len(),
        }
    }

    /// Rolling statistics for one agent, or `None` if it has no records
    pub async fn agent_performance(&self, agent_id: &str) -> Option<AgentPerformanceSummary> {
        let state = self.state.read().await;
        let aggregate = state.agents.get(agent_id)?;

        // True windowed ratio over the agent's most recent records, not a
        // running counter: records trimmed from the log no longer count.
        let window: Vec<&QueryPerformanceRecord> = state
            .records
            .iter()
            .rev()
            .filter(|r| r.agent_id.as_deref() == Some(agent_id))
            .take(self.config.hit_rate_window)
            .collect();
        let cache_hit_rate = if window.is_empty() {
            0.0
        } else {
            window.iter().filter(|r| r.cache_hit).count() as f64 / window.len() as f64 * 100.0
        };

        Some(AgentPerformanceSummary {
            agent_id: agent_id.to_string(),
            total_queries: aggregate.total_queries,
            successful_queries: aggregate.successful_queries,
            average_response_time_ms: aggregate.average_response_time_ms,
            cache_hit_rate,
            failure_rate: aggregate.failure_rate(),
            top_functions: aggregate.top_functions(),
        })
    }

    /// Threshold-based advisory alerts, computed on demand
    pub async fn performance_alerts(&self) -> Vec<PerformanceAlert> {
        let state = self.state.read().await;
        let mut alerts = Vec::new();

        // Slow queries among the last 5 executed (non-cache-hit) records.
        let recent: Vec<&QueryPerformanceRecord> = state
            .records
            .iter()
            .rev()
            .filter(|r| !r.cache_hit)
            .take(5)
            .collect();
        let slow = recent
            .iter()
            .filter(|r| r.execution_time_ms > self.config.slow_query_ms)
            .count();
        if slow > 0 {
            let severity = if slow > 3 {
                Severity::High
            } else {
                Severity::Medium
            };
            alerts.push(PerformanceAlert {
                kind: AlertKind::SlowQuery,
                severity,
                message: format!(
                    "{slow} of the last {} executed queries exceeded {} ms",
                    recent.len(),
                    self.config.slow_query_ms
                ),
                agent_id: None,
            });
        }

        let mut agent_ids: Vec<&String> = state.agents.keys().collect();
        agent_ids.sort();
        for agent_id in agent_ids {
            let aggregate = &state.agents[agent_id];
            if aggregate.total_queries >= 5 {
                let failure_rate = aggregate.failure_rate();
                if failure_rate > self.config.failure_rate_threshold {
                    let severity = if failure_rate > 50.0 {
                        Severity::High
                    } else {
                        Severity::Medium
                    };
                    alerts.push(PerformanceAlert {
                        kind: AlertKind::HighFailureRate,
                        severity,
                        message: format!(
                            "Agent {agent_id} failure rate is {failure_rate:.1}% over {} queries",
                            aggregate.total_queries
                        ),
                        agent_id: Some(agent_id.clone()),
                    });
                }
            }

            if aggregate.total_queries >= 10 {
                let window: Vec<&QueryPerformanceRecord> = state
                    .records
                    .iter()
                    .rev()
                    .filter(|r| r.agent_id.as_deref() == Some(agent_id.as_str()))
                    .take(self.config.hit_rate_window)
                    .collect();
                if !window.is_empty() {
                    let hit_rate =
                        window.iter().filter(|r| r.cache_hit).count() as f64 / window.len() as f64
                            * 100.0;
                    if hit_rate < self.config.hit_rate_threshold {
                        alerts.push(PerformanceAlert {
                            kind: AlertKind::LowCacheHitRate,
                            severity: Severity::Low,
                            message: format!(
                                "Agent {agent_id} cache hit rate is {hit_rate:.1}% over its last {} queries",
                                window.len()
                            ),
                            agent_id: Some(agent_id.clone()),
                        });
                    }
                }
            }
        }

        alerts
    }

    /// Number of retained records
    pub async fn record_count(&self) -> usize {
        self.state.read().await.records.len()
    }

    /// Oldest retained record timestamp, if any
    pub async fn oldest_record_id(&self) -> Option<Uuid> {
        self.state.read().await.records.front().map(|r| r.id)
    }

    /// Drop all records and aggregates
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.records.clear();
        state.agents.clear();
    }
}

impl Default for QueryMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(
        function: FunctionName,
        time_ms: u64,
        cache_hit: bool,
        success: bool,
        agent: Option<&str>,
    ) -> QueryPerformanceRecord {
        QueryPerformanceRecord::new(
            function,
            json!([]),
            time_ms,
            cache_hit,
            1,
            success,
            if success { None } else { Some("boom".into()) },
            agent.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn test_log_trims_oldest_past_ceiling() {
        let monitor = QueryMonitor::default();
        let first_id = monitor
            .log_query(record(FunctionName::SearchProducts, 5, false, true, None))
            .await;
        for _ in 0..1000 {
            monitor
                .log_query(record(FunctionName::SearchProducts, 5, false, true, None))
                .await;
        }
        assert_eq!(monitor.record_count().await, 1000);
        assert_ne!(monitor.oldest_record_id().await, Some(first_id));
    }

    #[tokio::test]
    async fn test_incremental_mean_matches_true_mean() {
        let monitor = QueryMonitor::default();
        for time in [10, 20, 30, 40] {
            monitor
                .log_query(record(
                    FunctionName::GetLowStockItems,
                    time,
                    false,
                    true,
                    Some("a1"),
                ))
                .await;
        }
        let summary = monitor.agent_performance("a1").await.unwrap();
        assert!((summary.average_response_time_ms - 25.0).abs() < 1e-9);
        assert_eq!(summary.total_queries, 4);
    }

    #[tokio::test]
    async fn test_hit_rate_uses_strict_50_record_window() {
        let monitor = QueryMonitor::default();
        // 10 misses followed by 50 hits: the window must only see the hits.
        for _ in 0..10 {
            monitor
                .log_query(record(FunctionName::SearchProducts, 5, false, true, Some("a1")))
                .await;
        }
        for _ in 0..50 {
            monitor
                .log_query(record(FunctionName::SearchProducts, 1, true, true, Some("a1")))
                .await;
        }
        let summary = monitor.agent_performance("a1").await.unwrap();
        assert!((summary.cache_hit_rate - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_top_functions_sorted_by_count() {
        let monitor = QueryMonitor::default();
        for _ in 0..3 {
            monitor
                .log_query(record(FunctionName::SearchProducts, 10, false, true, Some("a1")))
                .await;
        }
        monitor
            .log_query(record(
                FunctionName::GetTotalInventoryValue,
                10,
                false,
                true,
                Some("a1"),
            ))
            .await;
        let summary = monitor.agent_performance("a1").await.unwrap();
        assert_eq!(
            summary.top_functions[0].function_name,
            FunctionName::SearchProducts
        );
        assert_eq!(summary.top_functions[0].count, 3);
    }

    #[tokio::test]
    async fn test_slow_query_alert_escalates() {
        let monitor = QueryMonitor::default();
        for _ in 0..4 {
            monitor
                .log_query(record(FunctionName::GetInventorySummary, 2500, false, true, None))
                .await;
        }
        let alerts = monitor.performance_alerts().await;
        let slow = alerts
            .iter()
            .find(|a| a.kind == AlertKind::SlowQuery)
            .unwrap();
        assert_eq!(slow.severity, Severity::High);
    }

    #[tokio::test]
    async fn test_failure_rate_alert_needs_five_samples() {
        let monitor = QueryMonitor::default();
        for _ in 0..4 {
            monitor
                .log_query(record(FunctionName::SearchProducts, 5, false, false, Some("a1")))
                .await;
        }
        assert!(monitor
            .performance_alerts()
            .await
            .iter()
            .all(|a| a.kind != AlertKind::HighFailureRate));

        monitor
            .log_query(record(FunctionName::SearchProducts, 5, false, false, Some("a1")))
            .await;
        let alerts = monitor.performance_alerts().await;
        let alert = alerts
            .iter()
            .find(|a| a.kind == AlertKind::HighFailureRate)
            .unwrap();
        // 100% failure rate escalates past the 50% line.
        assert_eq!(alert.severity, Severity::High);
    }

    #[tokio::test]
    async fn test_low_hit_rate_alert_is_low_severity() {
        let monitor = QueryMonitor::default();
        for _ in 0..10 {
            monitor
                .log_query(record(FunctionName::SearchProducts, 5, false, true, Some("a1")))
                .await;
        }
        let alerts = monitor.performance_alerts().await;
        let alert = alerts
            .iter()
            .find(|a| a.kind == AlertKind::LowCacheHitRate)
            .unwrap();
        assert_eq!(alert.severity, Severity::Low);
    }

    #[tokio::test]
    async fn test_unknown_agent_has_no_summary() {
        let monitor = QueryMonitor::default();
        assert!(monitor.agent_performance("missing").await.is_none());
    }
}
