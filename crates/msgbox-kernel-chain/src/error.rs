//! Error types for attestation chains.

use msgbox_kernel_core::{CoreError, Digest, ValidationError, Watermark};
use thiserror::Error;

/// An attestation does not verify.
#[derive(Debug, Error)]
pub enum AttestationError {
    /// The statement belongs to another program.
    #[error("attestation is for program {got}, expected {expected}")]
    ForeignProgram { expected: Digest, got: Digest },

    /// The statement is internally inconsistent.
    #[error("malformed statement: {0}")]
    Malformed(&'static str),

    /// The proof does not verify against the statement.
    #[error("proof does not verify")]
    InvalidProof,

    /// An attestation does not extend the claimed predecessor.
    #[error("attestation does not link to its predecessor: {0}")]
    BrokenLink(&'static str),

    /// Sibling attestations started from different seeds.
    #[error("seed mismatch: {left} vs {right}")]
    SeedMismatch { left: Watermark, right: Watermark },

    /// Statement encoding failed.
    #[error("encoding error: {0}")]
    Encoding(#[from] CoreError),
}

/// Errors from building attestation chains and message proofs.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A predecessor attestation did not verify.
    #[error("attestation verification failed: {0}")]
    Attestation(#[from] AttestationError),

    /// The step count of a chain no longer fits.
    #[error("step count overflow")]
    StepOverflow,

    /// Chunks must hold at least one message.
    #[error("chunk size must be at least 1")]
    InvalidChunkSize,

    /// The message cannot be proven admissible.
    #[error("message is not admissible: {0}")]
    InvalidMessage(#[from] ValidationError),

    /// Private message proofs cover the credentialed form only.
    #[error("message does not carry a credential")]
    NotCredentialed,

    /// Transport encoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A background chain task failed.
    #[error("chain task failed: {0}")]
    TaskFailed(String),
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
