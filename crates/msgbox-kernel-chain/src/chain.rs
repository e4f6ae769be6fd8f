//! Chained batch attestations.
//!
//! Each extension verifies its predecessor, folds exactly one message, and
//! attests the result. A stream of any length is processed in bounded steps
//! and ends in one attestation that a verifier checks in constant time.

use msgbox_kernel_authz::Resolve;
use msgbox_kernel_core::{message_digest, BatchAccumulator, Message, Watermark};
use tracing::{debug, warn};

use crate::attestation::{
    Attestation, BatchAttestation, BatchStatement, ProgramId, Transition,
};
use crate::error::{AttestationError, ChainError, Result};
use crate::fold::fold_step;
use crate::proving::{AttestationVerifier, Attester, SignatureVerifier, SignedAttester};

/// Verifies batch attestations and the links between them.
#[derive(Debug, Clone)]
pub struct ChainVerifier<V> {
    verifier: V,
    program: ProgramId,
}

impl<V: AttestationVerifier> ChainVerifier<V> {
    /// Verify batch attestations with `verifier`.
    pub fn new(verifier: V) -> Self {
        Self {
            verifier,
            program: ProgramId::batch(),
        }
    }

    /// Verify an attestation and return its output.
    pub fn verify(
        &self,
        attestation: &BatchAttestation,
    ) -> std::result::Result<BatchAccumulator, AttestationError> {
        attestation.statement.check_shape()?;
        attestation.verify_proof(self.program, &self.verifier)?;
        Ok(attestation.output())
    }

    /// Verify that `next` extends `prior` by one step, from `prior`'s exact output.
    pub fn verify_link(
        &self,
        prior: &BatchAttestation,
        next: &BatchAttestation,
    ) -> std::result::Result<(), AttestationError> {
        self.verify(prior)?;
        self.verify(next)?;

        let statement = &next.statement;
        if statement.transition != Transition::Extend {
            return Err(AttestationError::BrokenLink("not an extension"));
        }
        if statement.predecessors[0] != prior.id()? {
            return Err(AttestationError::BrokenLink("predecessor id"));
        }
        if statement.from[0] != prior.output() {
            return Err(AttestationError::BrokenLink("predecessor output"));
        }
        if statement.seed != prior.seed() {
            return Err(AttestationError::BrokenLink("seed"));
        }
        if prior.statement.steps.checked_add(1) != Some(statement.steps) {
            return Err(AttestationError::BrokenLink("step count"));
        }
        Ok(())
    }
}

/// Builds batch attestation chains.
#[derive(Debug, Clone)]
pub struct ChainBuilder<A, V> {
    attester: A,
    verifier: ChainVerifier<V>,
}

impl ChainBuilder<SignedAttester, SignatureVerifier> {
    /// A builder that signs with `attester` and trusts only its key.
    pub fn signed(attester: SignedAttester) -> Self {
        let verifier = attester.verifier();
        Self::new(attester, verifier)
    }
}

impl<A: Attester, V: AttestationVerifier> ChainBuilder<A, V> {
    /// Create a builder.
    pub fn new(attester: A, verifier: V) -> Self {
        Self {
            attester,
            verifier: ChainVerifier::new(verifier),
        }
    }

    /// The verifier used for predecessors.
    pub fn verifier(&self) -> &ChainVerifier<V> {
        &self.verifier
    }

    /// Start a chain at `seed`.
    pub fn init_chain(&self, seed: Watermark) -> Result<BatchAttestation> {
        let statement = BatchStatement {
            program: ProgramId::batch(),
            transition: Transition::Init,
            seed,
            predecessors: Vec::new(),
            input: None,
            from: Vec::new(),
            output: BatchAccumulator::seeded(seed),
            steps: 0,
        };
        Ok(Attestation::seal(statement, &self.attester)?)
    }

    /// Verify `prior`, fold one message, and attest the result.
    pub fn extend_chain<R: Resolve + ?Sized>(
        &self,
        prior: &BatchAttestation,
        message: &Message,
        resolver: &R,
    ) -> Result<BatchAttestation> {
        let from = self.verified(prior)?;
        let output = fold_step(from, message, resolver);
        let input = message_digest(message).map_err(AttestationError::from)?;

        let statement = BatchStatement {
            program: ProgramId::batch(),
            transition: Transition::Extend,
            seed: prior.seed(),
            predecessors: vec![prior.id()?],
            input: Some(input),
            from: vec![from],
            output,
            steps: prior
                .statement
                .steps
                .checked_add(1)
                .ok_or(ChainError::StepOverflow)?,
        };
        Ok(Attestation::seal(statement, &self.attester)?)
    }

    /// Thread a whole chunk onto `prior`.
    pub fn extend_chunk<R: Resolve + ?Sized>(
        &self,
        prior: BatchAttestation,
        messages: &[Message],
        resolver: &R,
    ) -> Result<BatchAttestation> {
        messages
            .iter()
            .try_fold(prior, |att, message| self.extend_chain(&att, message, resolver))
    }

    /// Process a stream from `seed` in chunks of `chunk_size` messages.
    pub fn process_batch<R: Resolve + ?Sized>(
        &self,
        seed: Watermark,
        messages: &[Message],
        chunk_size: usize,
        resolver: &R,
    ) -> Result<BatchAttestation> {
        if chunk_size == 0 {
            return Err(ChainError::InvalidChunkSize);
        }

        let mut attestation = self.init_chain(seed)?;
        for (index, chunk) in messages.chunks(chunk_size).enumerate() {
            attestation = self.extend_chunk(attestation, chunk, resolver)?;
            debug!(
                chunk = index,
                len = chunk.len(),
                watermark = attestation.output().highest_msg_number,
                "chunk attested"
            );
        }
        Ok(attestation)
    }

    /// Combine two sibling chains that started from the same seed.
    pub fn merge(&self, left: &BatchAttestation, right: &BatchAttestation) -> Result<BatchAttestation> {
        let left_out = self.verified(left)?;
        let right_out = self.verified(right)?;

        if left.seed() != right.seed() {
            return Err(AttestationError::SeedMismatch {
                left: left.seed(),
                right: right.seed(),
            }
            .into());
        }

        let left_id = left.id()?;
        let right_id = right.id()?;
        if left_id == right_id {
            return Err(AttestationError::Malformed("merge of an attestation with itself").into());
        }
        let steps = left
            .statement
            .steps
            .checked_add(right.statement.steps)
            .ok_or(ChainError::StepOverflow)?;

        let statement = BatchStatement {
            program: ProgramId::batch(),
            transition: Transition::Merge,
            seed: left.seed(),
            predecessors: vec![left_id, right_id],
            input: None,
            from: vec![left_out, right_out],
            output: BatchAccumulator {
                highest_msg_number: left_out
                    .highest_msg_number
                    .max(right_out.highest_msg_number),
            },
            steps,
        };
        Ok(Attestation::seal(statement, &self.attester)?)
    }

    fn verified(&self, attestation: &BatchAttestation) -> Result<BatchAccumulator> {
        self.verifier.verify(attestation).map_err(|e| {
            warn!(error = %e, "rejected predecessor attestation");
            ChainError::from(e)
        })
    }
}
