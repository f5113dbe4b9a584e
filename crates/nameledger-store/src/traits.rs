//! NameStore trait: the abstract interface for the confirmed name database.
//!
//! The engine only reads through this trait; the chain writes through
//! [`NameStore::apply_record`] (or [`StoreExt::apply_name_output`]) as blocks
//! are connected. Implementations include SQLite and in-memory.

use async_trait::async_trait;
use nameledger_core::{Address, Height, NameOperation, NameRecord, NameState, Txid};

use crate::error::{Result, StoreError};

/// Result of applying a confirmed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// The name had no record before.
    Inserted,
    /// The record replaced an older one.
    Updated,
    /// The exact record is already current (idempotent - not an error).
    AlreadyApplied,
}

/// The NameStore trait: async interface for name persistence.
///
/// # Design Notes
///
/// - **History**: every applied record is appended to the name's history;
///   the last history entry always equals the current record.
/// - **Ordering**: names compare as raw bytes. Scans are ascending.
/// - **Idempotent applies**: re-applying the current record is a no-op.
#[async_trait]
pub trait NameStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the current record of a name.
    async fn get_name(&self, name: &[u8]) -> Result<Option<NameRecord>>;

    /// Get every record a name has had, oldest first.
    ///
    /// The last entry is the current record. Empty if the name is unknown.
    async fn get_history(&self, name: &[u8]) -> Result<Vec<NameRecord>>;

    /// Get up to `count` current records with `name >= start`, ascending.
    async fn scan(&self, start: &[u8], count: usize) -> Result<Vec<NameRecord>>;

    /// Get all current records, ascending by name.
    async fn all_names(&self) -> Result<Vec<NameRecord>>;

    /// Get the current records last updated at `height`.
    async fn names_at_height(&self, height: Height) -> Result<Vec<NameRecord>>;

    /// Number of registered names.
    async fn name_count(&self) -> Result<u64>;

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Make `record` the current state of its name and append it to history.
    async fn apply_record(&self, record: &NameRecord) -> Result<ApplyResult>;

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Check that every current record equals the last entry of its history
    /// and that history heights never decrease.
    async fn validate(&self) -> Result<()>;
}

/// Shared consistency check used by the backends' `validate`.
pub(crate) fn check_history(current: &NameRecord, history: &[NameRecord]) -> Result<()> {
    let last = history.last().ok_or_else(|| {
        StoreError::Inconsistent(format!("name {} has no history", display_name(&current.name)))
    })?;
    if last != current {
        return Err(StoreError::Inconsistent(format!(
            "current record of {} differs from its last history entry",
            display_name(&current.name)
        )));
    }
    if history.windows(2).any(|w| w[0].height > w[1].height) {
        return Err(StoreError::Inconsistent(format!(
            "history of {} goes back in height",
            display_name(&current.name)
        )));
    }
    Ok(())
}

/// Decide how `record` relates to the current one.
pub(crate) fn classify_apply(
    current: Option<&NameRecord>,
    record: &NameRecord,
) -> Result<ApplyResult> {
    match current {
        None => Ok(ApplyResult::Inserted),
        Some(current) if current == record => Ok(ApplyResult::AlreadyApplied),
        Some(current) if record.height < current.height => Err(StoreError::OutOfOrder {
            current: current.height,
            got: record.height,
        }),
        Some(_) => Ok(ApplyResult::Updated),
    }
}

fn display_name(name: &[u8]) -> String {
    nameledger_core::encode_name_for_message(name)
}

/// Extension trait for common store patterns.
pub trait StoreExt: NameStore {
    /// Apply the name output of a mined transaction.
    ///
    /// `name_new` outputs conceal the name and leave the database untouched;
    /// they return `None`.
    fn apply_name_output(
        &self,
        txid: Txid,
        vout: u32,
        op: &NameOperation,
        address: &Address,
        height: Height,
    ) -> impl std::future::Future<Output = Result<Option<ApplyResult>>> + Send;

    /// Lifecycle state of a name as far as the confirmed database knows.
    fn confirmed_state(
        &self,
        name: &[u8],
    ) -> impl std::future::Future<Output = Result<NameState>> + Send;
}

impl<S: NameStore + ?Sized> StoreExt for S {
    async fn apply_name_output(
        &self,
        txid: Txid,
        vout: u32,
        op: &NameOperation,
        address: &Address,
        height: Height,
    ) -> Result<Option<ApplyResult>> {
        let (name, value) = match op {
            NameOperation::NameNew { .. } => return Ok(None),
            NameOperation::NameFirstUpdate { name, value, .. }
            | NameOperation::NameUpdate { name, value } => (name.clone(), value.clone()),
        };
        let shown = nameledger_core::encode_name_for_message(&name);

        let record = NameRecord {
            name,
            value,
            txid,
            vout,
            address: address.clone(),
            height,
        };
        let result = self.apply_record(&record).await?;
        tracing::debug!(
            name = %shown,
            txid = %txid,
            height,
            ?result,
            "applied name output"
        );
        Ok(Some(result))
    }

    async fn confirmed_state(&self, name: &[u8]) -> Result<NameState> {
        Ok(match self.get_name(name).await? {
            Some(_) => NameState::Confirmed,
            None => NameState::Uncommitted,
        })
    }
}
