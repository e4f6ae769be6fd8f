//! Error types for the authorization module.

use msgbox_kernel_core::{AgentId, CoreError};
use thiserror::Error;

/// Errors from directory construction and resolution.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Resolution produced the sentinel record.
    #[error("agent {0} does not exist")]
    UnknownAgent(AgentId),

    /// A genesis entry carries the sentinel credential.
    #[error("genesis entry for agent {0} uses the sentinel credential")]
    SentinelCredential(AgentId),

    /// The same agent appears twice in a genesis document.
    #[error("duplicate genesis entry for agent {0}")]
    DuplicateAgent(AgentId),

    /// The genesis document could not be parsed.
    #[error("invalid genesis document: {0}")]
    InvalidGenesis(String),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;
