use thiserror::Error;

/// Failures the orchestration layer cannot fold into a reply
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("agent '{0}' has no provider assigned")]
    NoProvider(String),

    #[error("agent '{0}' is inactive")]
    InactiveAgent(String),
}
