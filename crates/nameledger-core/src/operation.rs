//! Name operations: the payload a transaction output can carry.
//!
//! A name goes through three operation kinds:
//!
//! - `name_new` commits to a name without revealing it,
//! - `name_firstupdate` reveals the name, proves the commitment and binds an
//!   initial value,
//! - `name_update` replaces the value of a registered name.

use bytes::Bytes;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::Blake3Hash;
use crate::error::CoreError;

/// Discriminator for name operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameOpKind {
    NameNew,
    NameFirstUpdate,
    NameUpdate,
}

impl NameOpKind {
    /// RPC spelling (`name_new`, `name_firstupdate`, `name_update`).
    pub fn as_str(self) -> &'static str {
        match self {
            NameOpKind::NameNew => "name_new",
            NameOpKind::NameFirstUpdate => "name_firstupdate",
            NameOpKind::NameUpdate => "name_update",
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            NameOpKind::NameNew => 1,
            NameOpKind::NameFirstUpdate => 2,
            NameOpKind::NameUpdate => 3,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(NameOpKind::NameNew),
            2 => Some(NameOpKind::NameFirstUpdate),
            3 => Some(NameOpKind::NameUpdate),
            _ => None,
        }
    }

    /// Whether the operation reveals a name and value.
    pub fn is_any_update(self) -> bool {
        !matches!(self, NameOpKind::NameNew)
    }
}

impl fmt::Display for NameOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NameOpKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name_new" => Ok(NameOpKind::NameNew),
            "name_firstupdate" => Ok(NameOpKind::NameFirstUpdate),
            "name_update" => Ok(NameOpKind::NameUpdate),
            other => Err(format!("unknown name operation: {}", other)),
        }
    }
}

/// Hash commitment to a name: Blake3(rand || name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(pub Blake3Hash);

impl Commitment {
    pub fn compute(rand: &[u8], name: &[u8]) -> Self {
        Self(Blake3Hash::hash_parts(&[rand, name]))
    }

    /// Whether `rand` and `name` open this commitment.
    pub fn opens(&self, rand: &[u8], name: &[u8]) -> bool {
        Self::compute(rand, name) == *self
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::MalformedScript("commitment must be 32 bytes".into()))?;
        Ok(Self(Blake3Hash(arr)))
    }
}

/// Generate a fresh commitment salt.
pub fn generate_rand(len: usize) -> Vec<u8> {
    let mut rand = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut rand);
    rand
}

/// A name operation carried by a transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameOperation {
    NameNew {
        commitment: Commitment,
    },
    NameFirstUpdate {
        name: Bytes,
        value: Bytes,
        rand: Bytes,
    },
    NameUpdate {
        name: Bytes,
        value: Bytes,
    },
}

impl NameOperation {
    pub fn name_new(rand: &[u8], name: &[u8]) -> Self {
        NameOperation::NameNew {
            commitment: Commitment::compute(rand, name),
        }
    }

    pub fn kind(&self) -> NameOpKind {
        match self {
            NameOperation::NameNew { .. } => NameOpKind::NameNew,
            NameOperation::NameFirstUpdate { .. } => NameOpKind::NameFirstUpdate,
            NameOperation::NameUpdate { .. } => NameOpKind::NameUpdate,
        }
    }

    /// The revealed name, if any.
    pub fn name(&self) -> Option<&Bytes> {
        match self {
            NameOperation::NameNew { .. } => None,
            NameOperation::NameFirstUpdate { name, .. } | NameOperation::NameUpdate { name, .. } => {
                Some(name)
            }
        }
    }

    pub fn value(&self) -> Option<&Bytes> {
        match self {
            NameOperation::NameNew { .. } => None,
            NameOperation::NameFirstUpdate { value, .. }
            | NameOperation::NameUpdate { value, .. } => Some(value),
        }
    }

    pub fn is_any_update(&self) -> bool {
        self.kind().is_any_update()
    }
}
