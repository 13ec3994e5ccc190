//! Agent-level errors.

use thiserror::Error;

use soul_core::SoulError;
use soul_llm::ResolveError;

/// Errors from the agent's external collaborators.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Topic lookup failed.
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// Tool directory failure (spawn, handshake, listing).
    #[error("Tool directory error: {0}")]
    Tool(String),

    /// State core failure.
    #[error(transparent)]
    Core(#[from] SoulError),

    /// Cognitive resolution failure.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        AgentError::Tool(err.to_string())
    }
}
