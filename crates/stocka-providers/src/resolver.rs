//! Provider resolution state machine
//!
//! Resolves a provider id to a live handle: cached handle first, then the
//! stored record, reactivating inactive records that still hold a usable
//! credential, decrypting the stored credential with an environment
//! fallback, validating credential shape and custom endpoints, and finally
//! constructing a kind-specific handle that stays cached until invalidated.

use crate::anthropic::AnthropicClient;
use crate::error::ProviderError;
use crate::handle::ProviderHandle;
use crate::openai::OpenAiClient;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use stocka_types::{AgentConfig, ProviderConfig, ProviderKind};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Configuration store collaborator; the relational store behind it is
/// external to this subsystem
#[async_trait]
pub trait ProviderStore: Send + Sync {
    async fn load_provider(&self, id: &str) -> anyhow::Result<Option<ProviderConfig>>;
    async fn reactivate_provider(&self, id: &str) -> anyhow::Result<()>;
    async fn list_active_providers(&self) -> anyhow::Result<Vec<ProviderConfig>>;
    async fn list_agents(&self) -> anyhow::Result<Vec<AgentConfig>>;
}

/// Credential store collaborator: `decrypt(ciphertext) -> plaintext`
pub trait CredentialCipher: Send + Sync {
    fn decrypt(&self, ciphertext: &str) -> anyhow::Result<String>;
}

/// Resolver tuning: endpoint allow-pattern, default sampling parameters,
/// and an environment override map for tests
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    endpoint_pattern: Regex,
    pub default_temperature: f64,
    pub default_max_tokens: u64,
    env_overrides: HashMap<String, String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoint_pattern: Regex::new(r"^https://[A-Za-z0-9.-]+(:\d+)?(/[A-Za-z0-9./_-]*)?$")
                .expect("endpoint pattern is valid"),
            default_temperature: 0.7,
            default_max_tokens: 1024,
            env_overrides: HashMap::new(),
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin an environment variable for tests instead of touching the process
    /// environment
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_overrides.insert(key.into(), value.into());
        self
    }

    fn env(&self, key: &str) -> Option<String> {
        self.env_overrides
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    }

    fn endpoint_allowed(&self, url: &str) -> bool {
        self.endpoint_pattern.is_match(url)
    }
}

/// Resolves provider handles and caches them per provider id
pub struct ProviderResolver {
    pub(crate) store: Arc<dyn ProviderStore>,
    cipher: Arc<dyn CredentialCipher>,
    handles: RwLock<HashMap<String, Arc<ProviderHandle>>>,
    config: ResolverConfig,
}

impl ProviderResolver {
    pub fn new(
        store: Arc<dyn ProviderStore>,
        cipher: Arc<dyn CredentialCipher>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            store,
            cipher,
            handles: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Resolve a live handle for a provider id
    #[instrument(skip(self))]
    pub async fn get_provider(
        &self,
        provider_id: &str,
    ) -> Result<Arc<ProviderHandle>, ProviderError> {
        if let Some(handle) = self.handles.read().await.get(provider_id) {
            return Ok(handle.clone());
        }

        let record = self
            .store
            .load_provider(provider_id)
            .await
            .map_err(|e| ProviderError::Store(e.to_string()))?
            .ok_or_else(|| ProviderError::NotFound(provider_id.to_string()))?;

        let record = if record.active {
            record
        } else {
            // An inactive record that still holds a usable credential gets
            // reactivated and resolved in the same pass.
            match self.resolve_credential(&record) {
                Ok(_) => {
                    info!(provider_id, "reactivating provider with usable credential");
                    self.store
                        .reactivate_provider(provider_id)
                        .await
                        .map_err(|e| ProviderError::Store(e.to_string()))?;
                    ProviderConfig {
                        active: true,
                        ..record
                    }
                }
                Err(_) => return Err(ProviderError::Inactive(provider_id.to_string())),
            }
        };

        let credential = self.resolve_credential(&record)?;
        let handle = Arc::new(self.build_handle(&record, &credential)?);

        self.handles
            .write()
            .await
            .insert(provider_id.to_string(), handle.clone());
        Ok(handle)
    }

    /// Credential chain: stored ciphertext first; decrypt failure, missing
    /// ciphertext, or a shape-invalid plaintext all fall back to the
    /// provider kind's environment variable.
    fn resolve_credential(&self, record: &ProviderConfig) -> Result<String, ProviderError> {
        let prefix = record.kind.credential_prefix();

        if let Some(ciphertext) = &record.encrypted_credential {
            match self.cipher.decrypt(ciphertext) {
                Ok(plaintext) if plaintext.starts_with(prefix) => return Ok(plaintext),
                Ok(_) => {
                    warn!(
                        provider_id = %record.id,
                        "stored credential has wrong shape, trying environment fallback"
                    );
                }
                Err(e) => {
                    warn!(
                        provider_id = %record.id,
                        error = %e,
                        "credential decryption failed, trying environment fallback"
                    );
                }
            }
        }

        let env_var = record.kind.env_var();
        if let Some(credential) = self.config.env(env_var) {
            if credential.starts_with(prefix) {
                debug!(provider_id = %record.id, env_var, "using environment credential");
                return Ok(credential);
            }
            warn!(provider_id = %record.id, env_var, "environment credential has wrong shape");
        }

        Err(ProviderError::MissingCredential(record.id.clone()))
    }

    fn build_handle(
        &self,
        record: &ProviderConfig,
        credential: &str,
    ) -> Result<ProviderHandle, ProviderError> {
        let base_url = match &record.base_url {
            Some(url) => {
                if !self.config.endpoint_allowed(url) {
                    return Err(ProviderError::InvalidEndpoint {
                        id: record.id.clone(),
                        url: url.clone(),
                    });
                }
                url.clone()
            }
            None => record.kind.default_base_url().to_string(),
        };

        let model = record
            .default_model
            .clone()
            .unwrap_or_else(|| record.kind.default_model().to_string());
        let temperature = record.temperature.unwrap_or(self.config.default_temperature);
        let max_tokens = record.max_tokens.unwrap_or(self.config.default_max_tokens);

        let handle = match record.kind {
            ProviderKind::OpenAi => ProviderHandle::openai(
                &record.id,
                OpenAiClient::new(base_url, credential),
                model,
                temperature,
                max_tokens,
            ),
            ProviderKind::Anthropic => ProviderHandle::anthropic(
                &record.id,
                AnthropicClient::new(base_url, credential),
                model,
                temperature,
                max_tokens,
            ),
        };
        Ok(handle)
    }

    /// Drop the cached handle for one provider, forcing re-resolution
    pub async fn invalidate(&self, provider_id: &str) {
        self.handles.write().await.remove(provider_id);
    }

    /// Drop every cached handle
    pub async fn clear_handles(&self) {
        self.handles.write().await.clear();
    }

    /// Number of currently cached handles
    pub async fn cached_handle_count(&self) -> usize {
        self.handles.read().await.len()
    }
}
