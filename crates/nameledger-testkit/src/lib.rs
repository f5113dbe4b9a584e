//! # Nameledger Testkit
//!
//! Testing utilities for nameledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Simulated chain**: an in-process [`SimLedger`] and [`SimWallet`] that
//!   enforce the mempool and block rules for name operations
//! - **Fixtures**: [`SimNode`] wires an engine to the simulation
//! - **Golden vectors**: byte sequences with their expected rendering in
//!   every encoding
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Scenario Tests
//!
//! ```rust,ignore
//! use nameledger_testkit::SimNode;
//!
//! let node = SimNode::with_history().await?;
//! node.register("d/abc", "{}", None).await?;
//! let info = node.engine.name_show("d/abc", None).await?;
//! assert_eq!(info.value(), Some("{}"));
//! ```
//!
//! ## Golden Vectors
//!
//! ```rust
//! use nameledger_testkit::vectors::verify_all_vectors;
//!
//! for (name, result) in verify_all_vectors() {
//!     assert!(result.is_ok(), "{}", name);
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod sim;
pub mod vectors;

pub use fixtures::{create_raw_transaction, init_tracing, Registration, SimEngine, SimNode};
pub use sim::{SimLedger, SimWallet, COINBASE_REWARD};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
