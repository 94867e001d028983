//! OpenAI-kind API client

use crate::error::ProviderError;
use serde_json::{json, Value};
use stocka_types::{ChatMessage, ChatResponse, RawUsage};

/// Bearer-authenticated client for OpenAI-compatible chat endpoints
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            http_client: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
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

        Ok(response.json().await?)
    }

    /// Send a chat completion request
    pub async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u64,
    ) -> Result<ChatResponse, ProviderError> {
        let body = json!({
            "model": model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        let response = self.post("chat/completions", &body).await?;
        Self::parse_completion(model, &response)
    }

    /// Send a vision request: the prompt plus one image reference
    pub async fn chat_with_image(
        &self,
        model: &str,
        image_url: &str,
        prompt: &str,
        max_tokens: u64,
    ) -> Result<ChatResponse, ProviderError> {
        let body = json!({
            "model": model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": prompt},
                    {"type": "image_url", "image_url": {"url": image_url}},
                ],
            }],
            "max_tokens": max_tokens,
        });
        let response = self.post("chat/completions", &body).await?;
        Self::parse_completion(model, &response)
    }

    /// Read-only capability probe; the models listing needs no tokens
    pub async fn probe(&self) -> Result<(), ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }
        Ok(())
    }

    fn parse_completion(model: &str, response: &Value) -> Result<ChatResponse, ProviderError> {
        let content = response
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .ok_or_else(|| {
                ProviderError::MalformedResponse("missing choices[0].message.content".to_string())
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
