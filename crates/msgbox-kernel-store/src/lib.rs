//! # Message Box Kernel Store
//!
//! Storage abstraction for the Message Box Kernel, with SQLite and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage
//! - [`CommitOutcome`] - Result of a watermark compare-and-swap
//! - [`AdminOutcome`] - Result of a genesis-gated administrative write
//!
//! ## Usage
//!
//! ```rust,no_run
//! use msgbox_kernel_store::{SqliteStore, Store};
//! use msgbox_kernel_core::Watermark;
//!
//! async fn example() {
//!     let store = SqliteStore::open("kernel.db").unwrap();
//!     let current = store.watermark().await.unwrap();
//!     let _ = store.compare_and_swap_watermark(current, Watermark(current.get() + 1)).await;
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AdminOutcome, CommitOutcome, Store};
