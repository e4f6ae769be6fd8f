//! Attestations: a public statement plus an opaque proof.
//!
//! Statements are encoded as canonical CBOR and digested under a
//! per-statement-type domain tag. The digest is what gets attested. An
//! attestation id covers both the statement and the proof bytes.

use std::fmt;

use bytes::Bytes;
use msgbox_kernel_core::{BatchAccumulator, CanonicalMap, CoreError, Digest, Watermark};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AttestationError, ChainError};
use crate::proving::{AttestationVerifier, Attester};

const PROGRAM_DOMAIN: &[u8] = b"msgbox-program-v1";
const ATTESTATION_DOMAIN: &[u8] = b"msgbox-attestation-v1";

/// Name of the batch folding program.
pub const BATCH_PROGRAM: &str = "msgbox/batch-fold";

/// Name of the private per-message program.
pub const MESSAGE_PROGRAM: &str = "msgbox/check-message";

/// Identifies the program a statement was produced by.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramId(pub Digest);

impl ProgramId {
    /// Derive the id of a named program.
    pub fn named(name: &str) -> Self {
        Self(Digest::tagged(PROGRAM_DOMAIN, name.as_bytes()))
    }

    /// The batch folding program.
    pub fn batch() -> Self {
        Self::named(BATCH_PROGRAM)
    }

    /// The private per-message program.
    pub fn message() -> Self {
        Self::named(MESSAGE_PROGRAM)
    }

    /// Fail unless this is `expected`.
    pub fn expect(&self, expected: ProgramId) -> Result<(), AttestationError> {
        if *self != expected {
            return Err(AttestationError::ForeignProgram {
                expected: expected.0,
                got: self.0,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProgramId({})", self.0)
    }
}

/// Content address of an attestation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttestationId(pub Digest);

impl fmt::Debug for AttestationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttestationId({})", self.0)
    }
}

impl fmt::Display for AttestationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The public half of an attestation.
pub trait PublicStatement: Clone + Serialize + DeserializeOwned {
    /// Domain tag for this statement type.
    const DOMAIN: &'static [u8];

    /// The program that produced the statement.
    fn program(&self) -> ProgramId;

    /// Canonical CBOR encoding.
    fn canonical_bytes(&self) -> Result<Vec<u8>, CoreError>;

    /// The digest that gets attested.
    fn attested_digest(&self) -> Result<Digest, CoreError> {
        Ok(Digest::tagged(Self::DOMAIN, &self.canonical_bytes()?))
    }
}

/// A statement with its proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation<S> {
    pub statement: S,
    pub proof: Bytes,
}

impl<S: PublicStatement> Attestation<S> {
    /// Attest `statement`.
    pub fn seal<A: Attester + ?Sized>(statement: S, attester: &A) -> Result<Self, AttestationError> {
        let digest = statement.attested_digest()?;
        let proof = attester.attest(digest.as_bytes())?;
        Ok(Self { statement, proof })
    }

    /// Compute the content address.
    pub fn id(&self) -> Result<AttestationId, AttestationError> {
        let mut data = self.statement.canonical_bytes()?;
        data.extend_from_slice(&self.proof);
        Ok(AttestationId(Digest::tagged(ATTESTATION_DOMAIN, &data)))
    }

    /// Check the statement's program and the proof.
    pub fn verify_proof<V: AttestationVerifier + ?Sized>(
        &self,
        program: ProgramId,
        verifier: &V,
    ) -> Result<(), AttestationError> {
        self.statement.program().expect(program)?;
        let digest = self.statement.attested_digest()?;
        verifier.verify(digest.as_bytes(), &self.proof)
    }

    /// Serialize for transport.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ChainError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| ChainError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from transport bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        ciborium::from_reader(bytes).map_err(|e| ChainError::Serialization(e.to_string()))
    }
}

/// How a batch attestation was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Transition {
    /// Start of a chain, output equals the seed.
    Init = 0,
    /// One message folded onto a predecessor.
    Extend = 1,
    /// Two sibling attestations combined.
    Merge = 2,
}

/// Public statement of a batch attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatement {
    /// The batch folding program.
    pub program: ProgramId,

    /// How this statement was derived.
    pub transition: Transition,

    /// Watermark the whole chain started from.
    pub seed: Watermark,

    /// Ids of the attestations this one builds on.
    pub predecessors: Vec<AttestationId>,

    /// Digest of the folded message (Extend only).
    pub input: Option<Digest>,

    /// Outputs of the predecessors, in order.
    pub from: Vec<BatchAccumulator>,

    /// The resulting accumulator.
    pub output: BatchAccumulator,

    /// Number of messages covered since the seed.
    pub steps: u64,
}

mod keys {
    pub const PROGRAM: u64 = 0;
    pub const TRANSITION: u64 = 1;
    pub const SEED: u64 = 2;
    pub const PREDECESSORS: u64 = 3;
    pub const INPUT: u64 = 4;
    pub const FROM: u64 = 5;
    pub const OUTPUT: u64 = 6;
    pub const STEPS: u64 = 7;
}

impl BatchStatement {
    /// Check that the statement's shape matches its transition.
    pub fn check_shape(&self) -> Result<(), AttestationError> {
        let seed = BatchAccumulator::seeded(self.seed);
        match self.transition {
            Transition::Init => {
                if !self.predecessors.is_empty() || !self.from.is_empty() || self.input.is_some() {
                    return Err(AttestationError::Malformed("init has inputs"));
                }
                if self.output != seed || self.steps != 0 {
                    return Err(AttestationError::Malformed("init output must equal seed"));
                }
            }
            Transition::Extend => {
                if self.predecessors.len() != 1 || self.from.len() != 1 || self.input.is_none() {
                    return Err(AttestationError::Malformed("extend needs one predecessor and one input"));
                }
                if self.output.highest_msg_number < self.from[0].highest_msg_number {
                    return Err(AttestationError::Malformed("extend output below predecessor"));
                }
                if self.steps == 0 {
                    return Err(AttestationError::Malformed("extend covers no messages"));
                }
            }
            Transition::Merge => {
                if self.predecessors.len() != 2 || self.from.len() != 2 || self.input.is_some() {
                    return Err(AttestationError::Malformed("merge needs two predecessors"));
                }
                if self.predecessors[0] == self.predecessors[1] {
                    return Err(AttestationError::Malformed("merge of an attestation with itself"));
                }
                let expected = self.from[0]
                    .highest_msg_number
                    .max(self.from[1].highest_msg_number);
                if self.output.highest_msg_number != expected {
                    return Err(AttestationError::Malformed("merge output must be the maximum"));
                }
            }
        }
        if self.output.highest_msg_number < seed.highest_msg_number {
            return Err(AttestationError::Malformed("output below seed"));
        }
        Ok(())
    }
}

impl PublicStatement for BatchStatement {
    const DOMAIN: &'static [u8] = b"msgbox-batch-statement-v1";

    fn program(&self) -> ProgramId {
        self.program
    }

    fn canonical_bytes(&self) -> Result<Vec<u8>, CoreError> {
        let mut map = CanonicalMap::new()
            .bytes(keys::PROGRAM, self.program.0.as_bytes())
            .uint(keys::TRANSITION, self.transition as u64)
            .uint(keys::SEED, self.seed.get())
            .byte_array(
                keys::PREDECESSORS,
                self.predecessors.iter().map(|id| &id.0.as_bytes()[..]),
            )
            .uint_array(keys::FROM, self.from.iter().map(|acc| acc.highest_msg_number))
            .uint(keys::OUTPUT, self.output.highest_msg_number)
            .uint(keys::STEPS, self.steps);
        if let Some(input) = &self.input {
            map = map.bytes(keys::INPUT, input.as_bytes());
        }
        map.to_bytes()
    }
}

/// An attestation over a batch fold.
pub type BatchAttestation = Attestation<BatchStatement>;

impl BatchAttestation {
    /// The accumulator this attestation vouches for.
    pub fn output(&self) -> BatchAccumulator {
        self.statement.output
    }

    /// The watermark the chain started from.
    pub fn seed(&self) -> Watermark {
        self.statement.seed
    }
}
