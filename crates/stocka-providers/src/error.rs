//! Provider error types

use stocka_types::ProviderKind;
use thiserror::Error;

/// Failures across provider resolution and runtime calls
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No provider record exists for the id
    #[error("Provider not found: {0}")]
    NotFound(String),

    /// Neither a stored nor an environment credential was usable
    #[error("Provider '{0}' has no usable credential")]
    MissingCredential(String),

    /// The stored ciphertext could not be decrypted
    #[error("Credential decryption failed for provider '{0}'")]
    DecryptFailed(String),

    /// The record is inactive and could not be reactivated
    #[error("Provider '{0}' is inactive")]
    Inactive(String),

    /// A custom endpoint failed the allow-pattern
    #[error("Invalid endpoint '{url}' for provider '{id}': must be an https URL")]
    InvalidEndpoint { id: String, url: String },

    /// Transport-level failure reaching the provider
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the provider API
    #[error("Provider API error {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body did not match the expected shape
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// The provider kind does not declare the requested capability
    #[error("Provider kind '{kind}' does not support {capability}")]
    Unsupported {
        kind: ProviderKind,
        capability: &'static str,
    },

    /// The configuration store failed
    #[error("Provider store error: {0}")]
    Store(String),
}

impl ProviderError {
    /// HTTP status for API errors, used by the probe classifier
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
