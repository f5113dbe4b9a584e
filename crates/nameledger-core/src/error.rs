//! Error types for nameledger core.

use thiserror::Error;

use crate::encoding::Encoding;

/// Message reported for any name or value that fails codec validation.
pub const INVALID_NAME_OR_VALUE: &str = "Name/value is invalid";

/// Core errors raised while decoding, validating or encoding name data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A name or value is not valid text in the effective encoding.
    ///
    /// The message is fixed so that every write and read path reports the
    /// same failure regardless of which field or operation triggered it.
    #[error("Name/value is invalid")]
    InvalidNameOrValue,

    #[error("invalid encoding: {0}")]
    UnknownEncoding(String),

    #[error("the name is too long")]
    NameTooLong,

    #[error("the value is too long")]
    ValueTooLong,

    #[error("invalid rand: {0}")]
    InvalidRand(String),

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("malformed script: {0}")]
    MalformedScript(String),

    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature")]
    InvalidSignature,
}

/// Lifecycle violations: an operation that does not fit the current state
/// of a name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("name_firstupdate does not spend a name_new output")]
    MissingCommitment,

    #[error("commitment does not match the revealed name and rand")]
    CommitmentMismatch,

    #[error("name_new has {confirmations} confirmations, {required} required")]
    CommitmentImmature { confirmations: u32, required: u32 },

    #[error("the name is already registered")]
    AlreadyRegistered,

    #[error("name_update on a name that is not registered")]
    NotRegistered,

    #[error("name_update does not spend the current name output")]
    WrongInput,

    #[error("name_update changes the name")]
    NameChanged,
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Per-field failure to render stored bytes in the requested encoding.
///
/// This is a value, not a call failure: read views carry it next to a
/// successfully decoded sibling field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("invalid data for {encoding}")]
pub struct FieldDecodeError {
    pub encoding: Encoding,
}

impl FieldDecodeError {
    pub fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }
}
