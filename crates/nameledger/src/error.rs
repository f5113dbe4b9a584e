//! Error types for the name engine.

use nameledger_core::{CoreError, LifecycleError, Txid};
use nameledger_store::StoreError;
use thiserror::Error;

use crate::ledger::{LedgerError, WalletError};

/// RPC error codes surfaced by [`EngineError::code`].
pub mod codes {
    pub const MISC_ERROR: i32 = -1;
    pub const TYPE_ERROR: i32 = -3;
    pub const WALLET_ERROR: i32 = -4;
    pub const INVALID_ADDRESS_OR_KEY: i32 = -5;
    pub const WALLET_INSUFFICIENT_FUNDS: i32 = -6;
    pub const INVALID_PARAMETER: i32 = -8;
    pub const DESERIALIZATION_ERROR: i32 = -22;
    pub const TRANSACTION_ALREADY_IN_CHAIN: i32 = -25;
    pub const VERIFY_REJECTED: i32 = -26;
    pub const INVALID_NAME_OR_VALUE: i32 = -1000;
}

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An options field has the wrong JSON type.
    #[error("Expected type string for {field}, got {got}")]
    TypeMismatch { field: String, got: &'static str },

    /// A name or value does not decode under the effective encoding.
    #[error("Name/value is invalid")]
    InvalidNameOrValue,

    #[error("{0}")]
    InvalidParameter(String),

    #[error("name not found: {0}")]
    NameNotFound(String),

    #[error("the name {0} is not owned by this wallet")]
    NameNotOwned(String),

    #[error("this name is already being registered")]
    AlreadyPending,

    #[error("-namehistory is not enabled")]
    HistoryDisabled,

    #[error("No information available about transaction {0}")]
    UnknownTransaction(Txid),

    #[error("TX decode failed: {0}")]
    Decode(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl EngineError {
    /// Numeric code reported to RPC clients.
    pub fn code(&self) -> i32 {
        match self {
            EngineError::TypeMismatch { .. } => codes::TYPE_ERROR,
            EngineError::InvalidNameOrValue => codes::INVALID_NAME_OR_VALUE,
            EngineError::InvalidParameter(_) | EngineError::Lifecycle(_) => {
                codes::INVALID_PARAMETER
            }
            EngineError::NameNotFound(_) | EngineError::NameNotOwned(_) => codes::WALLET_ERROR,
            EngineError::AlreadyPending => codes::TRANSACTION_ALREADY_IN_CHAIN,
            EngineError::HistoryDisabled | EngineError::Store(_) => codes::MISC_ERROR,
            EngineError::UnknownTransaction(_) => codes::INVALID_ADDRESS_OR_KEY,
            EngineError::Decode(_) => codes::DESERIALIZATION_ERROR,
            EngineError::Ledger(_) => codes::VERIFY_REJECTED,
            EngineError::Wallet(WalletError::InsufficientFunds { .. }) => {
                codes::WALLET_INSUFFICIENT_FUNDS
            }
            EngineError::Wallet(_) => codes::WALLET_ERROR,
        }
    }

    pub(crate) fn type_mismatch(field: &str, value: &serde_json::Value) -> Self {
        EngineError::TypeMismatch {
            field: field.to_string(),
            got: json_type_name(value),
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidNameOrValue => EngineError::InvalidNameOrValue,
            CoreError::MalformedScript(_) | CoreError::MalformedTransaction(_) => {
                EngineError::Decode(err.to_string())
            }
            other => EngineError::InvalidParameter(other.to_string()),
        }
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Failure to build a [`crate::NodeConfig`] from startup arguments.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Encoding(#[from] CoreError),

    #[error("invalid value for -{key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
