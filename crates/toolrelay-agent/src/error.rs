//! Error types for the agent crate.

use thiserror::Error;
use toolrelay_providers::ProviderError;

/// Failure of an agent run. Tool failures never surface here; they become
/// `{"error": ...}` results the model can read.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("conversation is empty")]
    EmptyConversation,
}

/// Failure talking to an MCP provider.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("invalid provider config: {0}")]
    Config(String),

    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("provider process closed its pipes")]
    Disconnected,

    #[error("request '{method}' timed out after {secs}s")]
    Timeout { method: String, secs: u64 },

    #[error("provider returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed provider response: {0}")]
    Protocol(String),
}
