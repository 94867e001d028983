//! Provider connectivity tests and system health aggregation

use crate::diagnosis::{classify_status, diagnose_provider_failure};
use crate::error::ProviderError;
use crate::resolver::ProviderResolver;
use serde::Serialize;
use stocka_types::{HealthStatus, ProviderDiagnosis, SystemHealth};
use tracing::{info, instrument, warn};

/// Outcome of a single provider connectivity test
#[derive(Debug, Clone, Serialize)]
pub struct ProviderTestResult {
    pub provider_id: String,
    pub success: bool,
    pub error: Option<String>,
    pub details: Option<ProviderDiagnosis>,
}

impl ProviderResolver {
    /// Resolve and live-probe one provider
    #[instrument(skip(self))]
    pub async fn test_provider(&self, provider_id: &str) -> ProviderTestResult {
        let handle = match self.get_provider(provider_id).await {
            Ok(handle) => handle,
            Err(e) => {
                return ProviderTestResult {
                    provider_id: provider_id.to_string(),
                    success: false,
                    error: Some(e.to_string()),
                    details: Some(diagnose_provider_failure(&e.to_string())),
                };
            }
        };

        match handle.probe().await {
            Ok(()) => ProviderTestResult {
                provider_id: provider_id.to_string(),
                success: true,
                error: None,
                details: None,
            },
            Err(e) => {
                let details = match e.status() {
                    Some(status) => classify_status(status),
                    None => diagnose_provider_failure(&e.to_string()),
                };
                ProviderTestResult {
                    provider_id: provider_id.to_string(),
                    success: false,
                    error: Some(e.to_string()),
                    details: Some(details),
                }
            }
        }
    }

    /// Walk all active providers with live tests and cross-reference agents
    /// against their assigned provider's state
    #[instrument(skip(self))]
    pub async fn system_health(&self) -> Result<SystemHealth, ProviderError> {
        let providers = self
            .store
            .list_active_providers()
            .await
            .map_err(|e| ProviderError::Store(e.to_string()))?;
        let agents = self
            .store
            .list_agents()
            .await
            .map_err(|e| ProviderError::Store(e.to_string()))?;

        let mut issues = Vec::new();
        let mut recommendations = Vec::new();
        let mut failing = 0usize;

        for provider in &providers {
            let result = self.test_provider(&provider.id).await;
            if !result.success {
                failing += 1;
                warn!(provider_id = %provider.id, "provider failed live test");
                issues.push(format!(
                    "Provider '{}' failed its connectivity test: {}",
                    provider.name,
                    result.error.as_deref().unwrap_or("unknown error")
                ));
                if let Some(details) = result.details {
                    recommendations.push(format!("{}: {}", provider.name, details.solution));
                }
            }
        }

        let active_provider_ids: Vec<&str> = providers.iter().map(|p| p.id.as_str()).collect();
        let mut agents_checked = 0usize;
        for agent in &agents {
            if !agent.active {
                continue;
            }
            agents_checked += 1;
            match agent.provider_id.as_deref() {
                None => {
                    issues.push(format!("Agent '{}' has no provider assigned", agent.name));
                    recommendations.push(format!(
                        "Assign a configured provider to agent '{}'",
                        agent.name
                    ));
                }
                Some(provider_id) if !active_provider_ids.contains(&provider_id) => {
                    issues.push(format!(
                        "Agent '{}' references provider '{}' which is missing or inactive",
                        agent.name, provider_id
                    ));
                    recommendations.push(format!(
                        "Reactivate provider '{provider_id}' or point agent '{}' elsewhere",
                        agent.name
                    ));
                }
                Some(_) => {}
            }
        }

        let status = if providers.is_empty() || (failing == providers.len() && failing > 0) {
            HealthStatus::Unhealthy
        } else if failing > 0 || !issues.is_empty() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        info!(
            ?status,
            providers = providers.len(),
            failing,
            agents = agents_checked,
            "system health computed"
        );

        Ok(SystemHealth {
            status,
            providers_checked: providers.len(),
            providers_failing: failing,
            agents_checked,
            issues,
            recommendations,
        })
    }
}
