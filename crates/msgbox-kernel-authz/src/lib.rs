//! # Message Box Kernel Authorization
//!
//! Where agent credentials come from, and how one authoritative record is
//! chosen for an agent.
//!
//! ## Sources
//!
//! - [`Directory`]: mutable, written by administrative registration, accepted
//!   direct messages and private updates
//! - [`GenesisDirectory`]: immutable, fixed once at bootstrap
//! - the sentinel record (credential `"00"`) when neither knows the agent
//!
//! ## Resolution
//!
//! [`Resolver`] consults both sources on every call and picks the result with
//! an arithmetic mask-select, so control flow never depends on which source
//! held the record. Only the final sentinel check gates acceptance.

pub mod directory;
pub mod error;
pub mod genesis;
pub mod resolver;

pub use directory::{AgentSource, Directory};
pub use error::{AuthzError, Result};
pub use genesis::{GenesisDirectory, GenesisEntry, GenesisFile};
pub use resolver::{select_first_present, Resolve, Resolver};
