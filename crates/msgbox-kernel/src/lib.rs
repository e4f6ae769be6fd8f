//! # Message Box Kernel
//!
//! The unified API for the Message Box system: authorize agent messages,
//! fold them into a watermark through chained attestations, and commit the
//! result.
//!
//! ## Overview
//!
//! - **Direct path**: [`Kernel::submit_message`] validates one message and
//!   advances its agent's record, or fails with no state change.
//! - **Batch path**: [`Kernel::build_batch`] folds a stream into a single
//!   attestation; invalid messages are skipped silently.
//!   [`Kernel::commit_batch`] verifies it and moves the watermark.
//! - **Private path**: [`Kernel::submit_private_update`] applies an
//!   attestation that a hidden message was valid for its agent.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use msgbox_kernel::{Kernel, KernelConfig};
//! use msgbox_kernel::chain::SignedAttester;
//! use msgbox_kernel::store::SqliteStore;
//!
//! async fn example() {
//!     let store = SqliteStore::open("kernel.db").unwrap();
//!     let kernel = Kernel::signed(store, SignedAttester::generate(), KernelConfig::default()).unwrap();
//!
//!     kernel
//!         .bootstrap_json(r#"{"agents": [{"agent_id": 7, "security_code": "A7"}]}"#)
//!         .await
//!         .unwrap();
//!
//!     // let attestation = kernel.build_batch(&messages).await.unwrap();
//!     // let watermark = kernel.commit_batch(&attestation).await.unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `msgbox_kernel::core` - Messages, records, validation rules
//! - `msgbox_kernel::authz` - Directories and the resolver
//! - `msgbox_kernel::chain` - Fold engine and attestations
//! - `msgbox_kernel::store` - Storage abstraction and SQLite

pub mod config;
pub mod error;
pub mod kernel;

pub use msgbox_kernel_authz as authz;
pub use msgbox_kernel_chain as chain;
pub use msgbox_kernel_core as core;
pub use msgbox_kernel_store as store;

pub use config::KernelConfig;
pub use error::{KernelError, Result};
pub use kernel::Kernel;

pub use msgbox_kernel_chain::{BatchAttestation, MessageAttestation};
pub use msgbox_kernel_core::{
    AgentId, AgentRecord, CredentialedDetails, LocationReport, Message, MessageText,
    SecurityCode, Watermark,
};
