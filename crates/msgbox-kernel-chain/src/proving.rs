//! The proving interface and the signed reference attester.
//!
//! The chain never looks inside proofs. An [`Attester`] turns a statement
//! digest into proof bytes; an [`AttestationVerifier`] accepts or rejects a
//! `(statement, proof)` pair. Any backend that fits these traits can replace
//! the signed attester.

use bytes::Bytes;
use msgbox_kernel_core::{Keypair, PublicKey, Signature};

use crate::error::AttestationError;

/// Produces proofs for statements.
pub trait Attester: Send + Sync {
    /// Attest a statement digest.
    fn attest(&self, statement: &[u8]) -> Result<Bytes, AttestationError>;
}

/// Checks proofs for statements.
pub trait AttestationVerifier: Send + Sync {
    /// Verify a proof over a statement digest.
    fn verify(&self, statement: &[u8], proof: &[u8]) -> Result<(), AttestationError>;
}

impl<T: Attester + ?Sized> Attester for std::sync::Arc<T> {
    fn attest(&self, statement: &[u8]) -> Result<Bytes, AttestationError> {
        (**self).attest(statement)
    }
}

impl<T: AttestationVerifier + ?Sized> AttestationVerifier for std::sync::Arc<T> {
    fn verify(&self, statement: &[u8], proof: &[u8]) -> Result<(), AttestationError> {
        (**self).verify(statement, proof)
    }
}

/// Attests by signing with an Ed25519 key.
#[derive(Debug, Clone)]
pub struct SignedAttester {
    keypair: Keypair,
}

impl SignedAttester {
    /// Create an attester with the given key.
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Create an attester with a fresh random key.
    pub fn generate() -> Self {
        Self::new(Keypair::generate())
    }

    /// The public key proofs verify under.
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// A verifier for this attester's proofs.
    pub fn verifier(&self) -> SignatureVerifier {
        SignatureVerifier::new(self.public_key())
    }
}

impl Attester for SignedAttester {
    fn attest(&self, statement: &[u8]) -> Result<Bytes, AttestationError> {
        let signature = self.keypair.sign(statement);
        Ok(Bytes::copy_from_slice(signature.as_bytes()))
    }
}

/// Verifies signed-attester proofs under a fixed public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureVerifier {
    public_key: PublicKey,
}

impl SignatureVerifier {
    /// Trust proofs signed by `public_key`.
    pub fn new(public_key: PublicKey) -> Self {
        Self { public_key }
    }

    /// The trusted key.
    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }
}

impl AttestationVerifier for SignatureVerifier {
    fn verify(&self, statement: &[u8], proof: &[u8]) -> Result<(), AttestationError> {
        let signature = Signature::from_slice(proof).map_err(|_| AttestationError::InvalidProof)?;
        self.public_key
            .verify(statement, &signature)
            .map_err(|_| AttestationError::InvalidProof)
    }
}
