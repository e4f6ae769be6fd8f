//! Error types for the Message Box Kernel Core.

use thiserror::Error;

use crate::types::{AgentId, MessageNumber};

/// Core errors: malformed primitives and encoding failures.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("security code must be two printable symbols, got {0:?}")]
    InvalidSecurityCode(String),

    #[error("message text must be exactly 12 symbols, got {len}")]
    InvalidMessageText { len: usize },

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Why a message failed its structural checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralFault {
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfBounds {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("checksum {got} does not match field sum {expected}")]
    ChecksumMismatch { expected: u128, got: u64 },

    #[error("y location {y_loc} must exceed x location {x_loc}")]
    LocationOrder { x_loc: u64, y_loc: u64 },

    #[error("message text is not exactly 12 symbols")]
    TextFormat,
}

/// Why a message failed authorization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationFault {
    #[error("agent {0} does not exist")]
    UnknownAgent(AgentId),

    #[error("security code does not match agent {0}")]
    CredentialMismatch(AgentId),
}

/// A message was rejected.
///
/// The direct submission path surfaces these; the batch fold swallows them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("structural validation failed: {0}")]
    Structural(#[from] StructuralFault),

    #[error("authorization failed: {0}")]
    Authorization(#[from] AuthorizationFault),

    #[error("message number {got} does not advance past {last}")]
    Sequencing {
        last: MessageNumber,
        got: MessageNumber,
    },
}

impl ValidationError {
    /// Check if this is a structural failure.
    pub fn is_structural(&self) -> bool {
        matches!(self, ValidationError::Structural(_))
    }

    /// Check if this is an authorization failure.
    pub fn is_authorization(&self) -> bool {
        matches!(self, ValidationError::Authorization(_))
    }

    /// Check if this is a sequencing failure.
    pub fn is_sequencing(&self) -> bool {
        matches!(self, ValidationError::Sequencing { .. })
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
