//! Capability-tagged provider handles
//!
//! A handle wraps a provider-kind-specific client together with resolved
//! defaults. Capabilities are declared per kind, so callers branch on the
//! declared set instead of probing for method presence.

use crate::anthropic::AnthropicClient;
use crate::error::ProviderError;
use crate::openai::OpenAiClient;
use stocka_types::{ChatMessage, ChatOptions, ChatResponse, ProviderKind};

/// What a provider handle can do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Chat,
    Vision,
}

#[derive(Clone, Debug)]
enum KindClient {
    OpenAi(OpenAiClient),
    Anthropic(AnthropicClient),
}

/// A live, resolved provider with defaults applied
#[derive(Debug, Clone)]
pub struct ProviderHandle {
    pub provider_id: String,
    pub kind: ProviderKind,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u64,
    client: KindClient,
}

impl ProviderHandle {
    pub fn openai(
        provider_id: impl Into<String>,
        client: OpenAiClient,
        model: impl Into<String>,
        temperature: f64,
        max_tokens: u64,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            kind: ProviderKind::OpenAi,
            model: model.into(),
            temperature,
            max_tokens,
            client: KindClient::OpenAi(client),
        }
    }

    pub fn anthropic(
        provider_id: impl Into<String>,
        client: AnthropicClient,
        model: impl Into<String>,
        temperature: f64,
        max_tokens: u64,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            kind: ProviderKind::Anthropic,
            model: model.into(),
            temperature,
            max_tokens,
            client: KindClient::Anthropic(client),
        }
    }

    /// Declared capability set for this handle's kind
    pub fn capabilities(&self) -> &'static [Capability] {
        match self.kind {
            ProviderKind::OpenAi => &[Capability::Chat, Capability::Vision],
            ProviderKind::Anthropic => &[Capability::Chat],
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Effective model for a request, after option overrides
    pub fn resolve_model(&self, options: &ChatOptions) -> String {
        options.model.clone().unwrap_or_else(|| self.model.clone())
    }

    /// Send a conversation to the provider
    pub async fn send_message(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse, ProviderError> {
        let model = self.resolve_model(options);
        let temperature = options.temperature.unwrap_or(self.temperature);
        let max_tokens = options.max_tokens.unwrap_or(self.max_tokens);
        match &self.client {
            KindClient::OpenAi(client) => {
                client.chat(&model, messages, temperature, max_tokens).await
            }
            KindClient::Anthropic(client) => {
                client.chat(&model, messages, temperature, max_tokens).await
            }
        }
    }

    /// Analyze one image with a prompt; requires the Vision capability
    pub async fn analyze_image(
        &self,
        image_url: &str,
        prompt: &str,
        options: &ChatOptions,
    ) -> Result<ChatResponse, ProviderError> {
        if !self.supports(Capability::Vision) {
            return Err(ProviderError::Unsupported {
                kind: self.kind,
                capability: "image analysis",
            });
        }
        let model = self.resolve_model(options);
        let max_tokens = options.max_tokens.unwrap_or(self.max_tokens);
        match &self.client {
            KindClient::OpenAi(client) => {
                client.chat_with_image(&model, image_url, prompt, max_tokens).await
            }
            KindClient::Anthropic(_) => unreachable!("vision capability checked above"),
        }
    }

    /// Read-only connectivity and credential probe
    pub async fn probe(&self) -> Result<(), ProviderError> {
        match &self.client {
            KindClient::OpenAi(client) => client.probe().await,
            KindClient::Anthropic(client) => client.probe().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anthropic_handle() -> ProviderHandle {
        ProviderHandle::anthropic(
            "p1",
            AnthropicClient::new("https://api.anthropic.com/v1", "sk-ant-test"),
            "claude-3-5-haiku",
            0.7,
            1024,
        )
    }

    #[test]
    fn test_capability_sets_per_kind() {
        let openai = ProviderHandle::openai(
            "p0",
            OpenAiClient::new("https://api.openai.com/v1", "sk-test"),
            "gpt-4o-mini",
            0.7,
            1024,
        );
        assert!(openai.supports(Capability::Vision));
        assert!(!anthropic_handle().supports(Capability::Vision));
    }

    #[tokio::test]
    async fn test_vision_on_chat_only_kind_is_rejected() {
        let handle = anthropic_handle();
        let err = handle
            .analyze_image("https://example.com/shelf.jpg", "what is on this shelf?", &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported { .. }));
    }

    #[test]
    fn test_option_overrides_take_precedence() {
        let handle = anthropic_handle();
        let options = ChatOptions {
            model: Some("claude-3-opus".to_string()),
            ..Default::default()
        };
        assert_eq!(handle.resolve_model(&options), "claude-3-opus");
        assert_eq!(handle.resolve_model(&ChatOptions::default()), "claude-3-5-haiku");
    }
}
