//! # Message Box Kernel Core
//!
//! Pure primitives for the Message Box Kernel: agent identities, credentials,
//! messages, and the validation rules that decide whether a message counts.
//!
//! This crate contains no I/O, no storage, no proving. Everything here is a
//! deterministic function of its inputs.
//!
//! ## Key Types
//!
//! - [`Message`] - A claimed sequence number plus one of two detail forms
//! - [`AgentRecord`] - Last accepted number and credential of an agent
//! - [`Watermark`] - Highest message number the system has accepted
//! - [`ValidationError`] - Structural, authorization or sequencing rejection
//!
//! ## Canonicalization
//!
//! Everything that is hashed or signed goes through deterministic CBOR. See
//! the [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod message;
pub mod types;
pub mod validation;

pub use canonical::{message_digest, CanonicalMap};
pub use crypto::{Digest, Keypair, PublicKey, Signature};
pub use error::{AuthorizationFault, CoreError, StructuralFault, ValidationError};
pub use message::{CredentialedDetails, LocationReport, Message, MessageDetails};
pub use types::{
    AgentId, AgentRecord, BatchAccumulator, MessageNumber, MessageText, SecurityCode, Watermark,
    MESSAGE_TEXT_BUFFER, MESSAGE_TEXT_LEN,
};
pub use validation::{check_message, is_authorized, is_well_formed};
