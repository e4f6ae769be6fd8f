//! Private per-message attestations.
//!
//! The prover holds the message and the agent's record; the statement only
//! exposes the message number, the agent id and a commitment to the
//! credential the message was checked against. The credential itself never
//! leaves the prover.

use msgbox_kernel_core::{
    validation::check_message, AgentId, AgentRecord, CanonicalMap, CoreError, Digest, Message,
    MessageNumber,
};
use serde::{Deserialize, Serialize};

use crate::attestation::{Attestation, ProgramId, PublicStatement};
use crate::error::{AttestationError, ChainError, Result};
use crate::proving::{AttestationVerifier, Attester};

/// Public output of a private message proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageOutput {
    pub message_number: MessageNumber,
    pub agent_id: AgentId,
    /// `SecurityCode::commitment` of the record the message was checked against.
    pub credential: Digest,
}

/// Public statement of a private message proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStatement {
    pub program: ProgramId,
    pub output: MessageOutput,
}

impl PublicStatement for MessageStatement {
    const DOMAIN: &'static [u8] = b"msgbox-message-statement-v1";

    fn program(&self) -> ProgramId {
        self.program
    }

    fn canonical_bytes(&self) -> std::result::Result<Vec<u8>, CoreError> {
        CanonicalMap::new()
            .bytes(0, self.program.0.as_bytes())
            .map(
                1,
                CanonicalMap::new()
                    .uint(0, self.output.message_number)
                    .uint(1, self.output.agent_id.get())
                    .bytes(2, self.output.credential.as_bytes()),
            )
            .to_bytes()
    }
}

/// An attestation that a hidden message was admissible for its agent.
pub type MessageAttestation = Attestation<MessageStatement>;

impl MessageAttestation {
    /// The attested output.
    pub fn output(&self) -> MessageOutput {
        self.statement.output
    }
}

/// Proves credentialed messages admissible.
#[derive(Debug, Clone)]
pub struct MessageProver<A> {
    attester: A,
}

impl<A: Attester> MessageProver<A> {
    /// Create a prover.
    pub fn new(attester: A) -> Self {
        Self { attester }
    }

    /// Prove `message` admissible against `record`.
    ///
    /// Refuses unless the message is credentialed, its text is valid, the
    /// credential matches and the number advances.
    pub fn prove_message(&self, message: &Message, record: &AgentRecord) -> Result<MessageAttestation> {
        if message.credentialed().is_none() {
            return Err(ChainError::NotCredentialed);
        }
        check_message(message, record)?;

        let statement = MessageStatement {
            program: ProgramId::message(),
            output: MessageOutput {
                message_number: message.message_number,
                agent_id: message.agent_id(),
                credential: record.security_code.commitment(message.agent_id()),
            },
        };
        Ok(Attestation::seal(statement, &self.attester)?)
    }
}

/// Verify a private message attestation and return its output.
pub fn verify_message_attestation<V: AttestationVerifier + ?Sized>(
    attestation: &MessageAttestation,
    verifier: &V,
) -> std::result::Result<MessageOutput, AttestationError> {
    attestation.verify_proof(ProgramId::message(), verifier)?;
    Ok(attestation.output())
}
