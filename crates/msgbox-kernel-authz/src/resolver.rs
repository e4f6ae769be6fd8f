//! Branchless layered resolution.
//!
//! Directory first, then genesis, then the sentinel. Every source is consulted
//! on every call and the winner is picked by masking, so neither timing nor
//! control flow reveals which source supplied the record.

use msgbox_kernel_core::{AgentId, AgentRecord, SecurityCode};

use crate::directory::{AgentSource, Directory};
use crate::error::{AuthzError, Result};
use crate::genesis::GenesisDirectory;

/// Produces the authoritative record for an agent.
pub trait Resolve: Send + Sync {
    /// Resolve an agent to a record. Returns the sentinel for unknown agents.
    fn resolve(&self, agent_id: AgentId) -> AgentRecord;

    /// Resolve an agent, failing on the sentinel.
    fn resolve_known(&self, agent_id: AgentId) -> Result<AgentRecord> {
        let record = self.resolve(agent_id);
        if record.is_sentinel() {
            return Err(AuthzError::UnknownAgent(agent_id));
        }
        Ok(record)
    }
}

/// All-ones when `present`, all-zeros otherwise.
#[inline]
fn mask64(present: bool) -> u64 {
    0u64.wrapping_sub(u64::from(present))
}

#[inline]
fn mask8(present: bool) -> u8 {
    0u8.wrapping_sub(u8::from(present))
}

#[inline]
fn select_record(present: bool, candidate: AgentRecord, otherwise: AgentRecord) -> AgentRecord {
    let m = mask64(present);
    let b = mask8(present);
    let c = candidate.security_code.as_bytes();
    let o = otherwise.security_code.as_bytes();
    AgentRecord::new(
        (candidate.last_message_number & m) | (otherwise.last_message_number & !m),
        SecurityCode::from_bytes([(c[0] & b) | (o[0] & !b), (c[1] & b) | (o[1] & !b)]),
    )
}

/// Pick the first present candidate, or `fallback` if none is present.
///
/// Every candidate is folded in regardless of position or presence.
pub fn select_first_present(candidates: &[Option<AgentRecord>], fallback: AgentRecord) -> AgentRecord {
    candidates.iter().rev().fold(fallback, |acc, candidate| {
        let present = candidate.is_some();
        let value = candidate.unwrap_or(AgentRecord::SENTINEL);
        select_record(present, value, acc)
    })
}

/// Resolves agents against a directory layered over a genesis directory.
#[derive(Debug, Clone, Default)]
pub struct Resolver<D = Directory, G = GenesisDirectory> {
    directory: D,
    genesis: G,
}

impl<D: AgentSource, G: AgentSource> Resolver<D, G> {
    /// Layer `directory` over `genesis`.
    pub fn new(directory: D, genesis: G) -> Self {
        Self { directory, genesis }
    }

    /// The mutable layer.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// The genesis layer.
    pub fn genesis(&self) -> &G {
        &self.genesis
    }
}

impl<D, G> Resolve for Resolver<D, G>
where
    D: AgentSource + Send + Sync,
    G: AgentSource + Send + Sync,
{
    fn resolve(&self, agent_id: AgentId) -> AgentRecord {
        let from_directory = self.directory.lookup(agent_id);
        let from_genesis = self.genesis.lookup(agent_id);
        select_first_present(&[from_directory, from_genesis], AgentRecord::SENTINEL)
    }
}
