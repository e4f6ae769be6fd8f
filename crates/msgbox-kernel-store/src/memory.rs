//! In-memory implementation of the Store trait.
//!
//! Same semantics as SQLite, no persistence. Used by tests and by callers
//! that only need a kernel for the lifetime of the process.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use msgbox_kernel_authz::{AgentSource, Directory, GenesisDirectory};
use msgbox_kernel_core::{AgentId, AgentRecord, Watermark};

use crate::error::{Result, StoreError};
use crate::traits::{AdminOutcome, CommitOutcome, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    directory: Directory,
    genesis: GenesisDirectory,
    genesis_installed: bool,
    watermark: Watermark,
    height: u64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_agent(&self, agent_id: AgentId) -> Result<Option<AgentRecord>> {
        Ok(self.read()?.directory.lookup(agent_id))
    }

    async fn load_directory(&self) -> Result<Directory> {
        Ok(self.read()?.directory.clone())
    }

    async fn register_agent(&self, agent_id: AgentId, record: AgentRecord) -> Result<AdminOutcome> {
        let mut inner = self.write()?;
        if inner.height > 0 {
            return Ok(AdminOutcome::PastGenesis {
                height: inner.height,
            });
        }
        inner.directory.insert(agent_id, record);
        Ok(AdminOutcome::Applied)
    }

    async fn apply_agent_update(&self, agent_id: AgentId, record: AgentRecord) -> Result<u64> {
        let mut inner = self.write()?;
        inner.directory.insert(agent_id, record);
        inner.height += 1;
        Ok(inner.height)
    }

    async fn get_genesis_agent(&self, agent_id: AgentId) -> Result<Option<AgentRecord>> {
        Ok(self.read()?.genesis.lookup(agent_id))
    }

    async fn load_genesis(&self) -> Result<GenesisDirectory> {
        Ok(self.read()?.genesis.clone())
    }

    async fn install_genesis(&self, genesis: &GenesisDirectory) -> Result<AdminOutcome> {
        let mut inner = self.write()?;
        if inner.genesis_installed {
            return Ok(AdminOutcome::AlreadyInstalled);
        }
        if inner.height > 0 {
            return Ok(AdminOutcome::PastGenesis {
                height: inner.height,
            });
        }
        inner.genesis = genesis.clone();
        inner.genesis_installed = true;
        Ok(AdminOutcome::Applied)
    }

    async fn genesis_installed(&self) -> Result<bool> {
        Ok(self.read()?.genesis_installed)
    }

    async fn watermark(&self) -> Result<Watermark> {
        Ok(self.read()?.watermark)
    }

    async fn height(&self) -> Result<u64> {
        Ok(self.read()?.height)
    }

    async fn compare_and_swap_watermark(
        &self,
        expected: Watermark,
        new: Watermark,
    ) -> Result<CommitOutcome> {
        let mut inner = self.write()?;
        if inner.watermark != expected {
            return Ok(CommitOutcome::Stale {
                current: inner.watermark,
            });
        }
        inner.watermark = new;
        inner.height += 1;
        Ok(CommitOutcome::Committed {
            height: inner.height,
        })
    }
}
