//! Provider and agent configuration plus the failure-diagnosis vocabulary

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The two supported external model backends
#[derive(Debug, Clone, Copy, Display, EnumString, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[strum(ascii_case_insensitive)]
pub enum ProviderKind {
    #[strum(serialize = "openai")]
    #[serde(rename = "openai")]
    OpenAi,
    #[strum(serialize = "anthropic")]
    #[serde(rename = "anthropic")]
    Anthropic,
}

impl ProviderKind {
    /// Environment variable consulted when no stored credential is usable
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// Expected credential prefix for shape validation
    pub fn credential_prefix(&self) -> &'static str {
        match self {
            // Anthropic keys also start with "sk-", so check Anthropic first
            // when sniffing a key of unknown origin.
            Self::OpenAi => "sk-",
            Self::Anthropic => "sk-ant-",
        }
    }

    /// Model used when neither agent nor provider names one
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-haiku-20241022",
        }
    }

    /// Default API base endpoint
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
        }
    }
}

/// A configured external model backend, read from the store and treated as
/// an immutable input per request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub name: String,
    pub kind: ProviderKind,
    /// Credential ciphertext; decrypted by the credential store collaborator
    pub encrypted_credential: Option<String>,
    pub default_model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
    /// Custom endpoint override, validated against the https allow-pattern
    pub base_url: Option<String>,
    pub active: bool,
}

/// A named agent configuration pairing a system prompt with a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    pub provider_id: Option<String>,
    pub system_prompt: String,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
    pub active: bool,
}

/// Coarse urgency tag attached to diagnosed failures and alerts
#[derive(
    Debug, Clone, Copy, Display, EnumString, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Uppercase label for user-visible message prefixes
    pub fn label(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

/// Classified category of a provider failure
#[derive(
    Debug, Clone, Copy, Display, EnumString, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorType {
    QuotaExceeded,
    InvalidCredential,
    RateLimited,
    NetworkError,
    ModelAccessDenied,
    ServiceUnavailable,
    Unknown,
}

/// How a diagnosis was reached; string matching is an explicitly labeled
/// last resort
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisSource {
    /// A structured error code or type field from the upstream response body
    StructuredCode,
    /// Substring heuristics over the error message text
    MessagePattern,
    /// A live read-only probe mapped from its HTTP status
    StatusProbe,
}

/// Computed on demand when a provider call or resolution fails; never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDiagnosis {
    pub reason: String,
    pub solution: String,
    pub error_type: ProviderErrorType,
    pub severity: Severity,
    pub source: DiagnosisSource,
}

impl ProviderDiagnosis {
    /// Severity-prefixed single-line message for user-visible replies
    pub fn user_message(&self) -> String {
        format!(
            "[{}] {} Suggested fix: {}",
            self.severity.label(),
            self.reason,
            self.solution
        )
    }
}

/// Tri-state outcome of the system health walk
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Aggregated provider/agent health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: HealthStatus,
    pub providers_checked: usize,
    pub providers_failing: usize,
    pub agents_checked: usize,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse() {
        let kind: ProviderKind = "OpenAI".parse().unwrap();
        assert_eq!(kind, ProviderKind::OpenAi);
        assert_eq!(kind.env_var(), "OPENAI_API_KEY");
    }

    #[test]
    fn test_severity_label() {
        assert_eq!(Severity::Critical.label(), "CRITICAL");
        assert_eq!(Severity::Critical.to_string(), "critical");
    }

    #[test]
    fn test_error_type_wire_name() {
        assert_eq!(
            ProviderErrorType::QuotaExceeded.to_string(),
            "quota_exceeded"
        );
    }

    #[test]
    fn test_diagnosis_user_message_prefix() {
        let diagnosis = ProviderDiagnosis {
            reason: "API quota exhausted.".into(),
            solution: "Review billing.".into(),
            error_type: ProviderErrorType::QuotaExceeded,
            severity: Severity::Critical,
            source: DiagnosisSource::MessagePattern,
        };
        assert!(diagnosis.user_message().starts_with("[CRITICAL]"));
    }
}
