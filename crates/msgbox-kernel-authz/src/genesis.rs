//! The immutable genesis directory.
//!
//! Fixed once at bootstrap, read-only afterwards. Can be built from entries or
//! loaded from a JSON document:
//!
//! ```json
//! {"agents": [{"agent_id": 7, "last_message_number": 0, "security_code": "A7"}]}
//! ```

use std::collections::BTreeMap;

use msgbox_kernel_core::{AgentId, AgentRecord, SecurityCode};
use serde::{Deserialize, Serialize};

use crate::directory::AgentSource;
use crate::error::{AuthzError, Result};

/// One agent in a genesis document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisEntry {
    pub agent_id: u64,
    #[serde(default)]
    pub last_message_number: u64,
    pub security_code: String,
}

/// A genesis document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisFile {
    pub agents: Vec<GenesisEntry>,
}

/// Read-only mapping from agent to record, fixed at bootstrap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenesisDirectory {
    records: BTreeMap<AgentId, AgentRecord>,
}

impl GenesisDirectory {
    /// An empty genesis directory.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from entries, rejecting sentinel credentials and duplicates.
    pub fn from_entries(entries: impl IntoIterator<Item = (AgentId, AgentRecord)>) -> Result<Self> {
        let mut records = BTreeMap::new();
        for (agent_id, record) in entries {
            if record.is_sentinel() {
                return Err(AuthzError::SentinelCredential(agent_id));
            }
            if records.insert(agent_id, record).is_some() {
                return Err(AuthzError::DuplicateAgent(agent_id));
            }
        }
        Ok(Self { records })
    }

    /// Build from a parsed genesis document.
    pub fn from_file(file: &GenesisFile) -> Result<Self> {
        let entries = file
            .agents
            .iter()
            .map(|entry| -> Result<(AgentId, AgentRecord)> {
                let code: SecurityCode = entry.security_code.parse()?;
                Ok((
                    AgentId::new(entry.agent_id),
                    AgentRecord::new(entry.last_message_number, code),
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_entries(entries)
    }

    /// Parse a JSON genesis document.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: GenesisFile =
            serde_json::from_str(json).map_err(|e| AuthzError::InvalidGenesis(e.to_string()))?;
        Self::from_file(&file)
    }

    /// Convert back to a genesis document.
    pub fn to_file(&self) -> GenesisFile {
        GenesisFile {
            agents: self
                .records
                .iter()
                .map(|(id, record)| GenesisEntry {
                    agent_id: id.get(),
                    last_message_number: record.last_message_number,
                    security_code: record.security_code.to_string(),
                })
                .collect(),
        }
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

impl AgentSource for GenesisDirectory {
    fn lookup(&self, agent_id: AgentId) -> Option<AgentRecord> {
        self.records.get(&agent_id).copied()
    }
}
