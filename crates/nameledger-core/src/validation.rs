//! Name operation validation.
//!
//! Every write path (`name_new`, `name_firstupdate`, `name_update` and the
//! raw-transaction builder) funnels its textual arguments through
//! [`validate_request`]. Checks run in a fixed order and stop at the first
//! failure:
//!
//! 1. name decodes under the effective name encoding
//! 2. value decodes under the effective value encoding (update kinds only)
//! 3. name and value lengths
//! 4. rand is well-formed hex of acceptable length
//!
//! Commitment and ownership checks happen later, against chain state.

use bytes::Bytes;

use crate::config::{ChainParams, EncodingConfig};
use crate::error::{CoreError, Result};
use crate::operation::{generate_rand, NameOpKind, NameOperation};

/// Textual arguments of a name operation, as received from a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameOpRequest<'a> {
    pub kind: NameOpKind,
    pub name: &'a str,
    pub value: Option<&'a str>,
    /// Hex commitment salt. Required for `name_firstupdate`; optional for
    /// `name_new`, where a fresh one is generated when absent.
    pub rand: Option<&'a str>,
}

impl<'a> NameOpRequest<'a> {
    pub fn name_new(name: &'a str) -> Self {
        Self {
            kind: NameOpKind::NameNew,
            name,
            value: None,
            rand: None,
        }
    }

    pub fn name_firstupdate(name: &'a str, rand: &'a str, value: &'a str) -> Self {
        Self {
            kind: NameOpKind::NameFirstUpdate,
            name,
            value: Some(value),
            rand: Some(rand),
        }
    }

    pub fn name_update(name: &'a str, value: &'a str) -> Self {
        Self {
            kind: NameOpKind::NameUpdate,
            name,
            value: Some(value),
            rand: None,
        }
    }
}

/// A request whose arguments passed every encoding and limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOp {
    pub kind: NameOpKind,
    pub name: Bytes,
    /// Empty for `name_new`.
    pub value: Bytes,
    pub rand: Option<Bytes>,
}

impl ValidatedOp {
    /// Build the operation to embed in a transaction.
    ///
    /// Returns the salt alongside so `name_new` callers can keep it for the
    /// later reveal.
    pub fn into_operation(self, params: &ChainParams) -> (NameOperation, Option<Bytes>) {
        match self.kind {
            NameOpKind::NameNew => {
                let rand = self
                    .rand
                    .unwrap_or_else(|| Bytes::from(generate_rand(params.rand_length)));
                let op = NameOperation::name_new(&rand, &self.name);
                (op, Some(rand))
            }
            NameOpKind::NameFirstUpdate => {
                let rand = self.rand.unwrap_or_default();
                let op = NameOperation::NameFirstUpdate {
                    name: self.name,
                    value: self.value,
                    rand: rand.clone(),
                };
                (op, Some(rand))
            }
            NameOpKind::NameUpdate => (
                NameOperation::NameUpdate {
                    name: self.name,
                    value: self.value,
                },
                None,
            ),
        }
    }
}

/// Decode and validate a request under the effective encodings.
pub fn validate_request(
    request: &NameOpRequest<'_>,
    encodings: &EncodingConfig,
    params: &ChainParams,
) -> Result<ValidatedOp> {
    let name = encodings.decode_name(request.name)?;

    let value = if request.kind.is_any_update() {
        let text = request.value.ok_or(CoreError::MissingField("value"))?;
        encodings.decode_value(text)?
    } else {
        Vec::new()
    };

    params.check_lengths(&name, Some(&value))?;

    let rand = match (request.kind, request.rand) {
        (NameOpKind::NameUpdate, _) => None,
        (NameOpKind::NameFirstUpdate, None) => return Err(CoreError::MissingField("rand")),
        (_, Some(text)) => Some(decode_rand(text, params)?),
        (NameOpKind::NameNew, None) => None,
    };

    Ok(ValidatedOp {
        kind: request.kind,
        name: Bytes::from(name),
        value: Bytes::from(value),
        rand: rand.map(Bytes::from),
    })
}

fn decode_rand(text: &str, params: &ChainParams) -> Result<Vec<u8>> {
    let rand = hex::decode(text).map_err(|e| CoreError::InvalidRand(e.to_string()))?;
    if rand.len() > params.rand_length {
        return Err(CoreError::InvalidRand(format!(
            "longer than {} bytes",
            params.rand_length
        )));
    }
    Ok(rand)
}

/// Consensus-level checks on an operation found in a transaction.
///
/// Encodings do not apply here: the chain stores raw bytes.
pub fn check_operation(op: &NameOperation, params: &ChainParams) -> Result<()> {
    match op {
        NameOperation::NameNew { .. } => Ok(()),
        NameOperation::NameFirstUpdate { name, value, rand } => {
            params.check_lengths(name, Some(value))?;
            if rand.len() > params.rand_length {
                return Err(CoreError::InvalidRand(format!(
                    "longer than {} bytes",
                    params.rand_length
                )));
            }
            Ok(())
        }
        NameOperation::NameUpdate { name, value } => params.check_lengths(name, Some(value)),
    }
}
