//! # Message Box Kernel Chain
//!
//! The fold engine and the attestations wrapped around it.
//!
//! ## Overview
//!
//! A batch of messages is folded into a running watermark one message at a
//! time. Each step is wrapped in an attestation that also verifies the step
//! before it, so the whole batch ends in a single attestation that a
//! committing authority checks without replaying the messages.
//!
//! ## Key Types
//!
//! - [`ChainBuilder`] - Builds chains: init, extend, chunked batches, merges
//! - [`ChainVerifier`] - Verifies batch attestations and their links
//! - [`BatchAttestation`] - Statement plus opaque proof
//! - [`MessageProver`] - Private per-message proofs
//!
//! ## Proving
//!
//! Proofs come from an [`Attester`] and are checked by an
//! [`AttestationVerifier`]. [`SignedAttester`] is the reference backend.

pub mod attestation;
pub mod chain;
pub mod error;
pub mod fold;
pub mod private;
pub mod proving;
pub mod tree;

pub use attestation::{
    Attestation, AttestationId, BatchAttestation, BatchStatement, ProgramId, PublicStatement,
    Transition,
};
pub use chain::{ChainBuilder, ChainVerifier};
pub use error::{AttestationError, ChainError, Result};
pub use fold::{admissible, fold_all, fold_step};
pub use private::{
    verify_message_attestation, MessageAttestation, MessageOutput, MessageProver, MessageStatement,
};
pub use proving::{AttestationVerifier, Attester, SignatureVerifier, SignedAttester};
pub use tree::process_batch_tree;
