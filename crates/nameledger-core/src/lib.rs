//! # nameledger core
//!
//! Pure primitives for the name ledger: encodings, name operations,
//! commitments, canonical transactions and the registration state machine.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Encoding`] - `ascii`, `hex` or `utf8` text rendering of raw bytes
//! - [`EncodingConfig`] - effective name/value encodings for one call
//! - [`NameOperation`] - `name_new`, `name_firstupdate` or `name_update`
//! - [`Transaction`] - canonical, content-addressed transaction
//! - [`NameRecord`] - the confirmed state of a name
//! - [`RenderedNameValue`] - a name/value pair rendered for a read view
//!
//! ## Validation
//!
//! Every write goes through [`validate_request`]. See [`validation`].

pub mod canonical;
pub mod config;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod lifecycle;
pub mod namespace;
pub mod operation;
pub mod record;
pub mod transaction;
pub mod types;
pub mod validation;

pub use config::{ChainParams, EncodingConfig, EncodingOverrides};
pub use crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
pub use encoding::{encode_name_for_message, Encoding};
pub use error::{CoreError, FieldDecodeError, LifecycleError, INVALID_NAME_OR_VALUE};
pub use lifecycle::NameState;
pub use namespace::Namespace;
pub use operation::{Commitment, NameOpKind, NameOperation};
pub use record::{NameRecord, NameStatus, RenderedField, RenderedNameValue};
pub use transaction::{Script, Transaction, TxIn, TxOut};
pub use types::{Address, Amount, Height, OutPoint, Txid};
pub use validation::{check_operation, validate_request, NameOpRequest, ValidatedOp};
