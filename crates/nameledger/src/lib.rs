//! # nameledger
//!
//! The name engine: registration of names through a commit/reveal protocol,
//! and the family of read views over registered names.
//!
//! ## Overview
//!
//! Names and values are raw bytes on chain. Callers see them as text in one
//! of three encodings (`ascii`, `hex`, `utf8`). The node has default
//! encodings fixed at start; every call may override them through its
//! options object.
//!
//! - **Writes**: `name_new`, `name_firstupdate`, `name_update`,
//!   `name_raw_transaction`, `sendtoname`
//! - **Reads**: `name_show`, `name_history`, `name_scan`, `name_list`,
//!   `name_filter`, `name_pending`, plus script, transaction and wallet
//!   transaction views
//!
//! ## Failure surface
//!
//! - A malformed options object fails with code -3 before anything else.
//! - A name or value that does not decode under the effective encoding
//!   fails with code -1000 and the message `Name/value is invalid`, on every
//!   write and read path alike.
//! - Stored bytes that do not render in the requested encoding do not fail
//!   the read: the field is replaced by `<field>_error`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use nameledger::{NameEngine, NodeConfig};
//! use nameledger::store::SqliteStore;
//!
//! async fn example(ledger: Arc<impl nameledger::Ledger>, wallet: Arc<impl nameledger::Wallet>) {
//!     let store = Arc::new(SqliteStore::open("names.db").unwrap());
//!     let config = NodeConfig::from_args(std::env::args()).unwrap();
//!     let engine = NameEngine::new(store, ledger, wallet, config);
//!
//!     let info = engine
//!         .name_show("642f616263", Some(&serde_json::json!({"nameEncoding": "hex"})))
//!         .await
//!         .unwrap();
//!     println!("{}", serde_json::to_string(&info).unwrap());
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod options;
pub mod views;

// Re-export component crates
pub use nameledger_core as core;
pub use nameledger_store as store;

pub use config::NodeConfig;
pub use engine::{NameEngine, NameFilter, DEFAULT_FILTER_MAX_AGE, DEFAULT_SCAN_COUNT};
pub use error::{codes, ConfigError, EngineError, Result};
pub use ledger::{
    Ledger, LedgerError, LedgerTx, PendingNameOp, TxCategory, Wallet, WalletDetail, WalletError,
    WalletTransaction,
};
pub use options::CallOptions;
pub use views::{
    FilterResult, FilterStat, ListTxEntry, NameInfo, NameNewResult, NameOpView, PendingInfo,
    RawTxResult, ScriptView, TxView, WalletDetailView, WalletTxView,
};

pub use nameledger_core::{
    Encoding, EncodingConfig, EncodingOverrides, NameRecord, NameState, NameStatus,
};
