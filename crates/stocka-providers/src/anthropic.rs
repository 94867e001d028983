//! Anthropic-kind API client

use crate::error::ProviderError;
use serde_json::{json, Value};
use stocka_types::{ChatMessage, ChatResponse, ChatRole, RawUsage};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Header-key-authenticated client for the Anthropic messages endpoint
#[derive(Clone)]
pub struct AnthropicClient {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .finish()
    }
}

impl AnthropicClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Send a chat request. System messages move to the dedicated `system`
    /// field; the messages array carries only user/assistant turns.
    pub async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u64,
    ) -> Result<ChatResponse, ProviderError> {
        let system: String = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let turns: Vec<&ChatMessage> = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .collect();

        let mut body = json!({
            "model": model,
            "messages": turns,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        if !system.is_empty() {
            body["system"] = json!(system);
        }

        let url = format!("{}/messages", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error response".to_string());
            return Err(ProviderError::Api { status, body });
        }

        let response: Value = response.json().await?;
        Self::parse_message(model, &response)
    }

    /// Read-only capability probe against the models listing
    pub async fn probe(&self) -> Result<(), ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }
        Ok(())
    }

    fn parse_message(model: &str, response: &Value) -> Result<ChatResponse, ProviderError> {
        let content = response
            .get("content")
            .and_then(|content| content.get(0))
            .and_then(|block| block.get("text"))
            .and_then(|text| text.as_str())
            .ok_or_else(|| {
                ProviderError::MalformedResponse("missing content[0].text".to_string())
            })?
            .to_string();

        let usage = response
            .get("usage")
            .and_then(|u| serde_json::from_value::<RawUsage>(u.clone()).ok())
            .map(|raw| raw.normalize());

        Ok(ChatResponse {
            content,
            model: response
                .get("model")
                .and_then(|m| m.as_str())
                .unwrap_or(model)
                .to_string(),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_normalizes_input_output_tokens() {
        let response = json!({
            "model": "claude-3-5-haiku-20241022",
            "content": [{"type": "text", "text": "hi there"}],
            "usage": {"input_tokens": 25, "output_tokens": 5}
        });
        let parsed = AnthropicClient::parse_message("claude-3-5-haiku", &response).unwrap();
        assert_eq!(parsed.content, "hi there");
        let usage = parsed.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 25);
        assert_eq!(usage.total_tokens, 30);
    }

    #[test]
    fn test_parse_message_rejects_missing_content() {
        let response = json!({"content": []});
        assert!(AnthropicClient::parse_message("claude-3-5-haiku", &response).is_err());
    }
}
