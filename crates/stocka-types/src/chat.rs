//! Chat message plumbing and token-usage normalization
//!
//! Providers disagree on usage field names; [`RawUsage`] accepts both known
//! shapes and reduces them to [`TokenUsage`] before costing.

use serde::{Deserialize, Serialize};

/// Message author role on the chat wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Per-request overrides for a model invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatOptions {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
}

/// Normalized token accounting for one invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Token usage as reported by a provider, before normalization.
///
/// OpenAI-style responses report `prompt_tokens`/`completion_tokens`;
/// Anthropic-style responses report `input_tokens`/`output_tokens`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawUsage {
    PromptCompletion {
        prompt_tokens: u64,
        completion_tokens: u64,
        #[serde(default)]
        total_tokens: Option<u64>,
    },
    InputOutput {
        input_tokens: u64,
        output_tokens: u64,
    },
}

impl RawUsage {
    /// Reduce either wire shape to the canonical form
    pub fn normalize(&self) -> TokenUsage {
        match *self {
            Self::PromptCompletion {
                prompt_tokens,
                completion_tokens,
                total_tokens,
            } => TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: total_tokens.unwrap_or(prompt_tokens + completion_tokens),
            },
            Self::InputOutput {
                input_tokens,
                output_tokens,
            } => TokenUsage::new(input_tokens, output_tokens),
        }
    }
}

/// A successful model round-trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}
