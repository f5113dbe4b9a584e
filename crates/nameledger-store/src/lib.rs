//! # nameledger store
//!
//! The confirmed name database. Provides a trait-based interface with
//! SQLite and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`NameStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`ApplyResult`] - Result of applying a confirmed record
//!
//! ## Usage
//!
//! ```rust,no_run
//! use nameledger_store::{NameStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("names.db").unwrap();
//!     let current = store.get_name(b"d/example").await.unwrap();
//!     let history = store.get_history(b"d/example").await.unwrap();
//!     assert_eq!(history.last(), current.as_ref());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Raw bytes**: names and values are stored as BLOBs; encodings are a
//!   presentation concern of the engine.
//! - **History**: kept for every name whether or not the node exposes it.
//! - **Idempotent applies**: re-applying the current record returns
//!   `AlreadyApplied`.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{ApplyResult, NameStore, StoreExt};
