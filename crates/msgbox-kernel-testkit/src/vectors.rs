//! Scenario vectors for the batch path.
//!
//! Each vector is a seed, a message stream and a chunk size, with the
//! watermark the chain must end on. They run against the fixture's genesis.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use msgbox_kernel_authz::Resolve;
use msgbox_kernel_chain::{ChainBuilder, ChainError, SignatureVerifier, SignedAttester};
use msgbox_kernel_core::{AgentId, LocationReport, Message, SecurityCode, Watermark};

use crate::fixtures::{credentialed, inverted_location, location, valid_run, GENESIS_AGENT, GENESIS_CODE};

/// A batch scenario with its expected outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Watermark the batch starts from.
    pub seed: u64,
    /// Messages in submission order.
    pub messages: Vec<Message>,
    /// Messages per chunk.
    pub chunk_size: usize,
    /// Watermark the chain must end on.
    pub expected: u64,
}

/// Get all scenario vectors.
pub fn all_vectors() -> Vec<ScenarioVector> {
    let n = 40;
    vec![
        ScenarioVector {
            name: "five valid messages in chunks of two",
            seed: 0,
            messages: valid_run(5),
            chunk_size: 2,
            expected: 5,
        },
        ScenarioVector {
            name: "invalid then valid",
            seed: n,
            messages: vec![
                inverted_location(GENESIS_AGENT, n + 1),
                location(GENESIS_AGENT, n + 2),
            ],
            chunk_size: 1,
            expected: n + 2,
        },
        ScenarioVector {
            name: "valid then invalid",
            seed: n,
            messages: vec![
                location(GENESIS_AGENT, n + 1),
                inverted_location(GENESIS_AGENT, n + 2),
            ],
            chunk_size: 1,
            expected: n + 1,
        },
        ScenarioVector {
            name: "empty batch keeps the seed",
            seed: 9,
            messages: Vec::new(),
            chunk_size: 4,
            expected: 9,
        },
        ScenarioVector {
            name: "numbers below the seed never lower it",
            seed: 100,
            messages: valid_run(50),
            chunk_size: 8,
            expected: 100,
        },
        ScenarioVector {
            name: "well-formed report from an unregistered agent counts",
            seed: 0,
            messages: vec![location(GENESIS_AGENT, 3), location(AgentId::new(8), 30)],
            chunk_size: 2,
            expected: 30,
        },
        ScenarioVector {
            name: "unregistered agent without a record cannot prove a credential",
            seed: 0,
            messages: vec![
                location(GENESIS_AGENT, 3),
                credentialed(AgentId::new(8), GENESIS_CODE, 30),
            ],
            chunk_size: 2,
            expected: 3,
        },
        ScenarioVector {
            name: "reserved agent bypasses the checks",
            seed: 0,
            messages: vec![
                location(GENESIS_AGENT, 3),
                Message::new(
                    LocationReport {
                        agent_id: AgentId::RESERVED,
                        x_loc: 90_000,
                        y_loc: 1,
                        checksum: 0,
                    },
                    12,
                ),
            ],
            chunk_size: 3,
            expected: 12,
        },
        ScenarioVector {
            name: "wrong credential is skipped",
            seed: 0,
            messages: vec![
                credentialed(GENESIS_AGENT, GENESIS_CODE, 4),
                credentialed(GENESIS_AGENT, SecurityCode::from_bytes(*b"B7"), 20),
            ],
            chunk_size: 1,
            expected: 4,
        },
        ScenarioVector {
            name: "sentinel credential authorizes nothing",
            seed: 0,
            messages: vec![credentialed(AgentId::new(9), SecurityCode::SENTINEL, 15)],
            chunk_size: 1,
            expected: 0,
        },
    ]
}

/// Run a vector through the sequential chain.
pub fn run_vector<R: Resolve + ?Sized>(
    builder: &ChainBuilder<SignedAttester, SignatureVerifier>,
    resolver: &R,
    vector: &ScenarioVector,
) -> Result<Watermark, ChainError> {
    let attestation = builder.process_batch(
        Watermark(vector.seed),
        &vector.messages,
        vector.chunk_size,
        resolver,
    )?;
    Ok(attestation.output().watermark())
}

/// All vectors as pretty-printed JSON, for inspection and fixtures.
pub fn vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&all_vectors())
}

/// A copy of `vector` with its messages shuffled and a random chunk size.
///
/// The expected watermark is unchanged: the fold is a running maximum.
pub fn reshuffled<G: Rng + ?Sized>(vector: &ScenarioVector, rng: &mut G) -> ScenarioVector {
    let mut messages = vector.messages.clone();
    messages.shuffle(rng);
    let chunk_size = rng.gen_range(1..=messages.len().max(1));
    ScenarioVector {
        messages,
        chunk_size,
        ..vector.clone()
    }
}
