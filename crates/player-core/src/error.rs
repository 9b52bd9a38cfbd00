//! Error Types

use std::time::Duration;

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Reasoning backend reported a failure (transport, status, payload)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Backend unreachable or failed its health probe
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Configuration rejected by local validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Loop could not be started
    #[error("Startup failed: {0}")]
    Startup(String),

    /// Perception collaborator failed to produce an observation
    #[error("Perception error: {0}")]
    Perception(String),

    /// Environment capability failed to apply
    #[error("Capability error: {0}")]
    Capability(String),

    /// A bounded wait ran out
    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },

    /// The caller gave up; any partial result must be discarded
    #[error("Operation cancelled")]
    Cancelled,

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Errors that stop an agent for good rather than skipping one tick
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Startup(_) | Self::ProviderUnavailable(_)
        )
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
