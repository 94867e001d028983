//! Failure classification
//!
//! Pure functions mapping an upstream failure to a severity-tagged
//! diagnosis with remediation text. Structured error codes from the
//! response body are preferred; substring matching over the message is a
//! labeled fallback; when no error text is available at all, callers use
//! the live status probe instead of guessing.

use crate::error::ProviderError;
use crate::handle::ProviderHandle;
use stocka_types::{DiagnosisSource, ProviderDiagnosis, ProviderErrorType, Severity};
use tracing::debug;

fn build(
    error_type: ProviderErrorType,
    severity: Severity,
    reason: &str,
    solution: &str,
    source: DiagnosisSource,
) -> ProviderDiagnosis {
    ProviderDiagnosis {
        reason: reason.to_string(),
        solution: solution.to_string(),
        error_type,
        severity,
        source,
    }
}

/// Classify a structured error code (e.g. OpenAI `error.code` / Anthropic
/// `error.type`), if the code is recognized
fn classify_code(code: &str) -> Option<ProviderDiagnosis> {
    let diagnosis = match code {
        "insufficient_quota" | "billing_hard_limit_reached" => build(
            ProviderErrorType::QuotaExceeded,
            Severity::Critical,
            "The provider account has exhausted its quota or billing limit.",
            "Review the provider's billing dashboard and add credits or raise the limit.",
            DiagnosisSource::StructuredCode,
        ),
        "invalid_api_key" | "authentication_error" | "invalid_request_error_api_key" => build(
            ProviderErrorType::InvalidCredential,
            Severity::High,
            "The API credential was rejected as invalid or expired.",
            "Re-enter the API key under Settings > Providers and save.",
            DiagnosisSource::StructuredCode,
        ),
        "rate_limit_exceeded" | "rate_limit_error" => build(
            ProviderErrorType::RateLimited,
            Severity::Medium,
            "Requests are being rate limited by the provider.",
            "Wait a moment and retry; reduce request frequency if it persists.",
            DiagnosisSource::StructuredCode,
        ),
        "model_not_found" | "permission_error" => build(
            ProviderErrorType::ModelAccessDenied,
            Severity::High,
            "The configured model is not accessible with this credential.",
            "Pick a model the account can access, or request access from the provider.",
            DiagnosisSource::StructuredCode,
        ),
        "overloaded_error" | "api_error" => build(
            ProviderErrorType::ServiceUnavailable,
            Severity::Low,
            "The provider service is temporarily unavailable.",
            "This is an upstream outage; retry later.",
            DiagnosisSource::StructuredCode,
        ),
        _ => return None,
    };
    Some(diagnosis)
}

/// Pull a structured error code out of a JSON error body embedded in the text
fn extract_code(error_text: &str) -> Option<String> {
    let start = error_text.find('{')?;
    let value: serde_json::Value = serde_json::from_str(error_text[start..].trim()).ok()?;
    let error = value.get("error")?;
    error
        .get("code")
        .or_else(|| error.get("type"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
}

/// Substring classification over the error message, in priority order.
/// Returns `None` for text matching no known pattern; callers then fall
/// back to the live probe rather than guessing.
pub fn classify_message(error_text: &str) -> Option<ProviderDiagnosis> {
    let lower = error_text.to_lowercase();
    let matches = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));

    if matches(&["insufficient_quota", "exceeded your current quota", "billing", "quota"]) {
        return Some(build(
            ProviderErrorType::QuotaExceeded,
            Severity::Critical,
            "The provider account has exhausted its quota or billing limit.",
            "Review the provider's billing dashboard and add credits or raise the limit.",
            DiagnosisSource::MessagePattern,
        ));
    }
    if matches(&[
        "invalid api key",
        "incorrect api key",
        "invalid x-api-key",
        "authentication",
        "unauthorized",
        "401",
        "expired",
    ]) {
        return Some(build(
            ProviderErrorType::InvalidCredential,
            Severity::High,
            "The API credential was rejected as invalid or expired.",
            "Re-enter the API key under Settings > Providers and save.",
            DiagnosisSource::MessagePattern,
        ));
    }
    if matches(&["rate_limit", "rate limit", "too many requests", "429"]) {
        return Some(build(
            ProviderErrorType::RateLimited,
            Severity::Medium,
            "Requests are being rate limited by the provider.",
            "Wait a moment and retry; reduce request frequency if it persists.",
            DiagnosisSource::MessagePattern,
        ));
    }
    if matches(&["network", "connection", "timed out", "timeout", "dns", "unreachable"]) {
        return Some(build(
            ProviderErrorType::NetworkError,
            Severity::Medium,
            "The provider could not be reached over the network.",
            "Check connectivity, DNS and any firewall or proxy in the path.",
            DiagnosisSource::MessagePattern,
        ));
    }
    if matches(&["model", "permission", "access denied", "does not exist", "forbidden"]) {
        return Some(build(
            ProviderErrorType::ModelAccessDenied,
            Severity::High,
            "The configured model is not accessible with this credential.",
            "Pick a model the account can access, or request access from the provider.",
            DiagnosisSource::MessagePattern,
        ));
    }
    if matches(&["unavailable", "overloaded", "bad gateway", "502", "503", "internal server error", "500"]) {
        return Some(build(
            ProviderErrorType::ServiceUnavailable,
            Severity::Low,
            "The provider service is temporarily unavailable.",
            "This is an upstream outage; retry later.",
            DiagnosisSource::MessagePattern,
        ));
    }
    None
}

/// Classify a failure from its error text. Structured codes win; message
/// patterns are a labeled fallback; unmatched text yields the generic
/// `unknown` diagnosis.
pub fn diagnose_provider_failure(error_text: &str) -> ProviderDiagnosis {
    if let Some(code) = extract_code(error_text) {
        if let Some(diagnosis) = classify_code(&code) {
            debug!(code, "diagnosed from structured error code");
            return diagnosis;
        }
    }
    classify_message(error_text).unwrap_or_else(|| {
        build(
            ProviderErrorType::Unknown,
            Severity::Medium,
            "The provider failed for an unrecognized reason.",
            "Run the provider connection test from Settings for a live diagnosis.",
            DiagnosisSource::MessagePattern,
        )
    })
}

/// Map a probe HTTP status to the same taxonomy, labeled as probe-sourced
pub fn classify_status(status: u16) -> ProviderDiagnosis {
    match status {
        401 | 403 => build(
            ProviderErrorType::InvalidCredential,
            Severity::High,
            "The API credential was rejected during a live probe.",
            "Re-enter the API key under Settings > Providers and save.",
            DiagnosisSource::StatusProbe,
        ),
        402 | 429 => build(
            ProviderErrorType::QuotaExceeded,
            Severity::Critical,
            "A live probe reported the account is out of quota.",
            "Review the provider's billing dashboard and add credits or raise the limit.",
            DiagnosisSource::StatusProbe,
        ),
        500..=599 => build(
            ProviderErrorType::ServiceUnavailable,
            Severity::Low,
            "A live probe found the provider service unavailable.",
            "This is an upstream outage; retry later.",
            DiagnosisSource::StatusProbe,
        ),
        _ => build(
            ProviderErrorType::Unknown,
            Severity::Medium,
            "A live probe failed with an unexpected status.",
            "Inspect the provider response body and configuration.",
            DiagnosisSource::StatusProbe,
        ),
    }
}

/// Diagnose via a live read-only probe when no error text is available
pub async fn diagnose_via_probe(handle: &ProviderHandle) -> Option<ProviderDiagnosis> {
    match handle.probe().await {
        Ok(()) => None,
        Err(ProviderError::Api { status, .. }) => Some(classify_status(status)),
        Err(e) => Some(diagnose_provider_failure(&e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_quota_is_critical() {
        let diagnosis = diagnose_provider_failure(
            "You exceeded your current quota, please check your plan and billing details. (insufficient_quota)",
        );
        assert_eq!(diagnosis.error_type, ProviderErrorType::QuotaExceeded);
        assert_eq!(diagnosis.severity, Severity::Critical);
    }

    #[test]
    fn test_rate_limit_is_medium() {
        let diagnosis = diagnose_provider_failure("rate_limit_exceeded: slow down");
        assert_eq!(diagnosis.error_type, ProviderErrorType::RateLimited);
        assert_eq!(diagnosis.severity, Severity::Medium);
    }

    #[test]
    fn test_structured_code_wins_over_message_patterns() {
        // The message text mentions "billing", but the structured code says
        // the credential is invalid; the code wins.
        let body = r#"API error: {"error": {"code": "invalid_api_key", "message": "see billing page"}}"#;
        let diagnosis = diagnose_provider_failure(body);
        assert_eq!(diagnosis.error_type, ProviderErrorType::InvalidCredential);
        assert_eq!(diagnosis.source, DiagnosisSource::StructuredCode);
    }

    #[test]
    fn test_unmatched_message_is_not_guessed() {
        assert!(classify_message("zorp flibbered the gronk").is_none());
    }

    #[test]
    fn test_unmatched_text_degrades_to_unknown() {
        let diagnosis = diagnose_provider_failure("zorp flibbered the gronk");
        assert_eq!(diagnosis.error_type, ProviderErrorType::Unknown);
        assert_eq!(diagnosis.severity, Severity::Medium);
    }

    #[test]
    fn test_probe_status_mapping() {
        assert_eq!(
            classify_status(401).error_type,
            ProviderErrorType::InvalidCredential
        );
        assert_eq!(
            classify_status(429).error_type,
            ProviderErrorType::QuotaExceeded
        );
        assert_eq!(
            classify_status(503).error_type,
            ProviderErrorType::ServiceUnavailable
        );
        assert_eq!(classify_status(503).source, DiagnosisSource::StatusProbe);
    }

    #[test]
    fn test_network_error_classification() {
        let diagnosis = diagnose_provider_failure("connection timed out after 30s");
        assert_eq!(diagnosis.error_type, ProviderErrorType::NetworkError);
    }
}
