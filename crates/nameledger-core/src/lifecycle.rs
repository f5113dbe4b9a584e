//! The registration state machine.
//!
//! ```text
//! Uncommitted --name_new--> Committed --name_firstupdate--> Pending --mined--> Confirmed
//!                                                                     ^          |
//!                                                                     +--update--+
//! ```
//!
//! The transition table lives in [`NameState::apply`]. The chain-facing rules
//! (commitment opening, maturity depth, spending the current output) are
//! [`check_firstupdate`] and [`check_update`].

use serde::{Deserialize, Serialize};

use crate::config::ChainParams;
use crate::error::LifecycleError;
use crate::operation::{Commitment, NameOpKind};
use crate::record::NameRecord;
use crate::types::{Height, OutPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameState {
    /// Nothing is known about the name.
    Uncommitted,
    /// A `name_new` exists; the name itself is still concealed.
    Committed,
    /// The name has been revealed by an unconfirmed operation.
    Pending,
    /// The name is registered on chain.
    Confirmed,
}

impl NameState {
    /// State after submitting an operation of `kind`.
    pub fn apply(self, kind: NameOpKind) -> Result<NameState, LifecycleError> {
        use NameState::*;
        match (self, kind) {
            (Uncommitted | Committed, NameOpKind::NameNew) => Ok(Committed),
            // A new commitment does not affect a revealed name.
            (Pending | Confirmed, NameOpKind::NameNew) => Ok(self),

            (Committed, NameOpKind::NameFirstUpdate) => Ok(Pending),
            (Uncommitted, NameOpKind::NameFirstUpdate) => Err(LifecycleError::MissingCommitment),
            (Pending | Confirmed, NameOpKind::NameFirstUpdate) => {
                Err(LifecycleError::AlreadyRegistered)
            }

            (Pending | Confirmed, NameOpKind::NameUpdate) => Ok(self),
            (Uncommitted | Committed, NameOpKind::NameUpdate) => Err(LifecycleError::NotRegistered),
        }
    }

    /// State once the pending operation is mined.
    pub fn confirm(self) -> NameState {
        match self {
            NameState::Pending => NameState::Confirmed,
            other => other,
        }
    }
}

/// Confirmations of an output mined at `included`, seen from a block at
/// `height`. The including block counts as the first confirmation.
pub fn confirmations(included: Height, height: Height) -> u32 {
    if height < included {
        0
    } else {
        height - included + 1
    }
}

/// Check a `name_firstupdate` about to be mined at `height`.
///
/// `commitment` is the `name_new` output it spends, mined at `committed_at`
/// (`None` while still in the mempool). `current` is the confirmed record
/// for the name, if any.
pub fn check_firstupdate(
    commitment: &Commitment,
    committed_at: Option<Height>,
    name: &[u8],
    rand: &[u8],
    current: Option<&NameRecord>,
    height: Height,
    params: &ChainParams,
) -> Result<(), LifecycleError> {
    if !commitment.opens(rand, name) {
        return Err(LifecycleError::CommitmentMismatch);
    }
    let confirmations = committed_at.map_or(0, |at| confirmations(at, height));
    if confirmations < params.min_firstupdate_depth {
        return Err(LifecycleError::CommitmentImmature {
            confirmations,
            required: params.min_firstupdate_depth,
        });
    }
    if current.is_some() {
        return Err(LifecycleError::AlreadyRegistered);
    }
    Ok(())
}

/// Check a `name_update` that spends `spent` and names `name`.
///
/// `spent_name` is the name carried by the spent output, if it was a name
/// output at all.
pub fn check_update(
    name: &[u8],
    spent: &OutPoint,
    spent_name: Option<&[u8]>,
    current: Option<&NameRecord>,
) -> Result<(), LifecycleError> {
    let current = current.ok_or(LifecycleError::NotRegistered)?;
    match spent_name {
        None => return Err(LifecycleError::WrongInput),
        Some(spent_name) if spent_name != name => return Err(LifecycleError::NameChanged),
        Some(_) => {}
    }
    if current.outpoint() != *spent {
        return Err(LifecycleError::WrongInput);
    }
    Ok(())
}
