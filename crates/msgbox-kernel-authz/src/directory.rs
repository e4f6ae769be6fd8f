//! The mutable agent directory.

use std::collections::BTreeMap;

use msgbox_kernel_core::{AgentId, AgentRecord};

/// Anything that can look up an agent record.
pub trait AgentSource {
    /// Look up the record for an agent, if this source has one.
    fn lookup(&self, agent_id: AgentId) -> Option<AgentRecord>;
}

impl<T: AgentSource + ?Sized> AgentSource for &T {
    fn lookup(&self, agent_id: AgentId) -> Option<AgentRecord> {
        (**self).lookup(agent_id)
    }
}

/// Mutable mapping from agent to record.
///
/// Every write replaces the whole record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    records: BTreeMap<AgentId, AgentRecord>,
}

impl Directory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the record for an agent, returning the previous one.
    pub fn insert(&mut self, agent_id: AgentId, record: AgentRecord) -> Option<AgentRecord> {
        self.records.insert(agent_id, record)
    }

    /// Get the record for an agent.
    pub fn get(&self, agent_id: AgentId) -> Option<&AgentRecord> {
        self.records.get(&agent_id)
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate in agent order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, AgentRecord)> + '_ {
        self.records.iter().map(|(id, record)| (*id, *record))
    }
}

impl AgentSource for Directory {
    fn lookup(&self, agent_id: AgentId) -> Option<AgentRecord> {
        self.records.get(&agent_id).copied()
    }
}

impl FromIterator<(AgentId, AgentRecord)> for Directory {
    fn from_iter<I: IntoIterator<Item = (AgentId, AgentRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
