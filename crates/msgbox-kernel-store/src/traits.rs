//! Store trait: the abstract interface for kernel state.
//!
//! The kernel persists three things: the agent directory, the genesis
//! directory, and a single state row (watermark, height, genesis flag).
//! Operations that touch more than one of these are atomic inside the store.

use async_trait::async_trait;
use msgbox_kernel_authz::{Directory, GenesisDirectory};
use msgbox_kernel_core::{AgentId, AgentRecord, Watermark};

use crate::error::Result;

/// Outcome of an administrative write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOutcome {
    /// The write was applied.
    Applied,
    /// The genesis directory was installed earlier.
    AlreadyInstalled,
    /// The system has moved past genesis.
    PastGenesis { height: u64 },
}

/// Outcome of a watermark compare-and-swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The watermark was replaced and the height advanced.
    Committed { height: u64 },
    /// The stored watermark did not match the expected one.
    Stale { current: Watermark },
}

/// Async interface for kernel persistence.
///
/// All methods are async so SQLite can run on blocking threads.
///
/// # Design Notes
///
/// - **Full-record writes**: agent records are always replaced whole.
/// - **Atomic transitions**: a committed transition and its height bump
///   happen in one step.
/// - **Genesis gating**: administrative writes check the height in the same
///   step that applies them.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Directory Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get an agent's directory record.
    async fn get_agent(&self, agent_id: AgentId) -> Result<Option<AgentRecord>>;

    /// Snapshot the whole directory.
    async fn load_directory(&self) -> Result<Directory>;

    /// Write a directory record while the system is still at genesis.
    async fn register_agent(&self, agent_id: AgentId, record: AgentRecord) -> Result<AdminOutcome>;

    /// Replace an agent's record and advance the height. Returns the new height.
    async fn apply_agent_update(&self, agent_id: AgentId, record: AgentRecord) -> Result<u64>;

    // ─────────────────────────────────────────────────────────────────────────
    // Genesis Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get an agent's genesis record.
    async fn get_genesis_agent(&self, agent_id: AgentId) -> Result<Option<AgentRecord>>;

    /// Snapshot the genesis directory.
    async fn load_genesis(&self) -> Result<GenesisDirectory>;

    /// Install the genesis directory, once, at height 0.
    async fn install_genesis(&self, genesis: &GenesisDirectory) -> Result<AdminOutcome>;

    /// Check whether a genesis directory has been installed.
    async fn genesis_installed(&self) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Kernel State
    // ─────────────────────────────────────────────────────────────────────────

    /// The stored watermark.
    async fn watermark(&self) -> Result<Watermark>;

    /// Number of committed state transitions.
    async fn height(&self) -> Result<u64>;

    /// Replace the watermark if it still equals `expected`, advancing the height.
    async fn compare_and_swap_watermark(
        &self,
        expected: Watermark,
        new: Watermark,
    ) -> Result<CommitOutcome>;
}
