//! Chat orchestration
//!
//! One chat turn: resolve the agent's provider, assemble the system prompt,
//! send the conversation, account the token usage, then fold any function
//! call the model made back into the visible reply. Provider failures are
//! diagnosed and become the reply text rather than an error; the only hard
//! errors left are agent misconfigurations the caller must fix.

use crate::context;
use crate::error::AgentError;
use std::sync::Arc;
use std::time::Instant;
use stocka_cache::ResultCache;
use stocka_functions::{strip_directive, FunctionRegistry, InventoryReader};
use stocka_providers::{diagnose_provider_failure, ProviderResolver};
use stocka_telemetry::{CostTracker, QueryMonitor};
use stocka_types::{
    AgentConfig, ChatMessage, ChatOptions, OperationType, ProviderDiagnosis, TokenUsage,
};
use tracing::{info, instrument, warn};

/// What one chat turn produced
#[derive(Debug, Clone)]
pub struct AgentReply {
    /// Final user-visible text, with any function result folded in
    pub content: String,
    /// Model that actually answered, when the call went through
    pub model: Option<String>,
    pub usage: Option<TokenUsage>,
    /// Whether the model invoked a catalogue function this turn
    pub function_called: bool,
    /// False when the provider call failed and the content is a diagnosis
    pub success: bool,
    pub diagnosis: Option<ProviderDiagnosis>,
}

/// A model response with its call directive resolved
#[derive(Debug, Clone)]
pub struct FoldedReply {
    pub content: String,
    pub function_called: bool,
    /// Parse or execution failure of the directive, if any
    pub function_error: Option<String>,
}

/// Ties the provider resolver, function registry and telemetry together
/// into per-turn chat operations
pub struct AgentService {
    resolver: Arc<ProviderResolver>,
    registry: Arc<FunctionRegistry>,
    reader: Arc<dyn InventoryReader>,
    cache: Arc<ResultCache>,
    monitor: Arc<QueryMonitor>,
    cost: CostTracker,
}

impl AgentService {
    pub fn new(
        resolver: Arc<ProviderResolver>,
        registry: Arc<FunctionRegistry>,
        reader: Arc<dyn InventoryReader>,
        cache: Arc<ResultCache>,
        monitor: Arc<QueryMonitor>,
        cost: CostTracker,
    ) -> Self {
        Self {
            resolver,
            registry,
            reader,
            cache,
            monitor,
            cost,
        }
    }

    pub fn monitor(&self) -> &Arc<QueryMonitor> {
        &self.monitor
    }

    pub fn resolver(&self) -> &Arc<ProviderResolver> {
        &self.resolver
    }

    /// Run one chat turn for an agent
    #[instrument(skip(self, agent, history, user_message), fields(agent_id = %agent.id))]
    pub async fn chat(
        &self,
        agent: &AgentConfig,
        history: &[ChatMessage],
        user_message: &str,
    ) -> Result<AgentReply, AgentError> {
        if !agent.active {
            return Err(AgentError::InactiveAgent(agent.name.clone()));
        }
        let provider_id = agent
            .provider_id
            .as_deref()
            .ok_or_else(|| AgentError::NoProvider(agent.name.clone()))?;

        let started = Instant::now();
        let handle = match self.resolver.get_provider(provider_id).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(provider_id, error = %e, "provider resolution failed");
                return Ok(Self::diagnosed_reply(&e.to_string()));
            }
        };

        // Best-effort snapshot; a read failure degrades the prompt, not the turn.
        let snapshot = self.reader.inventory_summary().await.ok();
        let system = context::build_system_prompt(
            agent,
            snapshot.as_ref(),
            &self.registry.catalog_text(),
        );

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(user_message));

        let options = ChatOptions {
            model: agent.model.clone(),
            temperature: agent.temperature,
            max_tokens: agent.max_tokens,
        };
        let model = handle.resolve_model(&options);

        match handle.send_message(&messages, &options).await {
            Ok(response) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                let usage = response.usage.unwrap_or_default();
                self.cost
                    .log_usage(
                        Some(provider_id.to_string()),
                        Some(agent.id.clone()),
                        &response.model,
                        usage,
                        duration_ms,
                        OperationType::Chat,
                        true,
                        None,
                    )
                    .await;

                let folded = self
                    .fold_model_text(&response.content, Some(&agent.id))
                    .await;
                Ok(AgentReply {
                    content: folded.content,
                    model: Some(response.model),
                    usage: Some(usage),
                    function_called: folded.function_called,
                    success: true,
                    diagnosis: None,
                })
            }
            Err(e) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                warn!(provider_id, error = %e, "model call failed");
                let diagnosis = diagnose_provider_failure(&e.to_string());
                self.cost
                    .log_usage(
                        Some(provider_id.to_string()),
                        Some(agent.id.clone()),
                        &model,
                        TokenUsage::default(),
                        duration_ms,
                        OperationType::Chat,
                        false,
                        Some(diagnosis.error_type.to_string()),
                    )
                    .await;
                Ok(AgentReply {
                    content: diagnosis.user_message(),
                    model: Some(model),
                    usage: None,
                    function_called: false,
                    success: false,
                    diagnosis: Some(diagnosis),
                })
            }
        }
    }

    /// Analyze one image through the agent's provider, if it supports vision
    #[instrument(skip(self, agent, prompt), fields(agent_id = %agent.id))]
    pub async fn analyze_image(
        &self,
        agent: &AgentConfig,
        image_url: &str,
        prompt: &str,
    ) -> Result<AgentReply, AgentError> {
        let provider_id = agent
            .provider_id
            .as_deref()
            .ok_or_else(|| AgentError::NoProvider(agent.name.clone()))?;

        let started = Instant::now();
        let handle = match self.resolver.get_provider(provider_id).await {
            Ok(handle) => handle,
            Err(e) => return Ok(Self::diagnosed_reply(&e.to_string())),
        };

        let options = ChatOptions {
            model: agent.model.clone(),
            temperature: agent.temperature,
            max_tokens: agent.max_tokens,
        };
        let model = handle.resolve_model(&options);

        match handle.analyze_image(image_url, prompt, &options).await {
            Ok(response) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                let usage = response.usage.unwrap_or_default();
                self.cost
                    .log_usage(
                        Some(provider_id.to_string()),
                        Some(agent.id.clone()),
                        &response.model,
                        usage,
                        duration_ms,
                        OperationType::ImageAnalysis,
                        true,
                        None,
                    )
                    .await;
                Ok(AgentReply {
                    content: response.content,
                    model: Some(response.model),
                    usage: Some(usage),
                    function_called: false,
                    success: true,
                    diagnosis: None,
                })
            }
            Err(e) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                let diagnosis = diagnose_provider_failure(&e.to_string());
                self.cost
                    .log_usage(
                        Some(provider_id.to_string()),
                        Some(agent.id.clone()),
                        &model,
                        TokenUsage::default(),
                        duration_ms,
                        OperationType::ImageAnalysis,
                        false,
                        Some(diagnosis.error_type.to_string()),
                    )
                    .await;
                Ok(AgentReply {
                    content: diagnosis.user_message(),
                    model: Some(model),
                    usage: None,
                    function_called: false,
                    success: false,
                    diagnosis: Some(diagnosis),
                })
            }
        }
    }

    /// Resolve the call directive in a model response, replacing it with the
    /// executed result (or a short failure note) in the visible text
    pub async fn fold_model_text(&self, model_text: &str, agent_id: Option<&str>) -> FoldedReply {
        let outcome = self.registry.parse_and_execute(model_text, agent_id).await;
        if !outcome.has_function {
            return FoldedReply {
                content: model_text.to_string(),
                function_called: false,
                function_error: None,
            };
        }

        let stripped = strip_directive(model_text);
        // A failed directive folds its actual explanation into the reply:
        // the parameter or catalogue listing in the error text is what lets
        // the model (or the user) correct the call.
        let (body, function_error) = match (outcome.formatted_response, outcome.error) {
            (Some(formatted), _) => (formatted, None),
            (None, Some(error)) => (
                format!("I could not complete that inventory lookup: {error}"),
                Some(error),
            ),
            (None, None) => (
                "I could not complete that inventory lookup.".to_string(),
                None,
            ),
        };
        let content = if stripped.is_empty() {
            body
        } else {
            format!("{stripped}\n\n{body}")
        };
        FoldedReply {
            content,
            function_called: true,
            function_error,
        }
    }

    /// Drop cached query results and provider handles
    pub async fn shutdown(&self) {
        self.cache.clear().await;
        self.resolver.clear_handles().await;
        info!("agent service caches cleared");
    }
}

impl AgentService {
    fn diagnosed_reply(error_text: &str) -> AgentReply {
        let diagnosis = diagnose_provider_failure(error_text);
        AgentReply {
            content: diagnosis.user_message(),
            model: None,
            usage: None,
            function_called: false,
            success: false,
            diagnosis: Some(diagnosis),
        }
    }
}
