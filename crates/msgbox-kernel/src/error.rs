//! Error types for the Kernel.

use msgbox_kernel_authz::AuthzError;
use msgbox_kernel_chain::{AttestationError, ChainError};
use msgbox_kernel_core::{AgentId, ValidationError, Watermark};
use msgbox_kernel_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Kernel operations.
#[derive(Debug, Error)]
pub enum KernelError {
    /// A directly submitted message was rejected.
    #[error("invalid message: {0}")]
    InvalidMessage(#[from] ValidationError),

    /// A supplied attestation does not verify.
    #[error("attestation verification failed: {0}")]
    AttestationVerification(#[from] AttestationError),

    /// An administrative operation was attempted after genesis.
    #[error("administrative ordering violated: {0}")]
    AdministrativeOrdering(String),

    /// The attested agent resolves to the sentinel record.
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),

    /// The batch was seeded from a watermark that is no longer current.
    #[error("stale seed: batch started at {seed}, stored watermark is {current}")]
    StaleSeed { seed: Watermark, current: Watermark },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Chain construction error.
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    /// Directory error.
    #[error("authorization error: {0}")]
    Authz(#[from] AuthzError),
}

impl KernelError {
    /// Check if this is a rejected direct message.
    pub fn is_invalid_message(&self) -> bool {
        matches!(self, KernelError::InvalidMessage(_))
    }

    /// Check if this is an attestation verification failure.
    pub fn is_attestation_failure(&self) -> bool {
        matches!(self, KernelError::AttestationVerification(_))
    }
}

/// Result type for Kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
