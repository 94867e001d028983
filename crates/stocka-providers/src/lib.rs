//! Provider resolution and failure diagnosis
//!
//! Resolves which external model backend to use for a request through a
//! layered fallback chain (cached handle, stored credential, environment
//! credential, reactivation), constructs capability-tagged handles for the
//! two supported provider kinds, and classifies failures into a
//! severity-tagged taxonomy with remediation text.

pub mod anthropic;
pub mod diagnosis;
pub mod error;
pub mod handle;
pub mod health;
pub mod openai;
pub mod resolver;

pub use diagnosis::{
    classify_message, classify_status, diagnose_provider_failure, diagnose_via_probe,
};
pub use error::ProviderError;
pub use handle::{Capability, ProviderHandle};
pub use health::ProviderTestResult;
pub use resolver::{CredentialCipher, ProviderResolver, ProviderStore, ResolverConfig};
