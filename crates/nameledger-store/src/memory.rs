//! In-memory implementation of the NameStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;
use nameledger_core::{Height, NameRecord};

use crate::error::{Result, StoreError};
use crate::traits::{check_history, classify_apply, ApplyResult, NameStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Current records, ordered by raw name bytes.
    names: BTreeMap<Bytes, NameRecord>,

    /// Every applied record per name, oldest first.
    history: HashMap<Bytes, Vec<NameRecord>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NameStore for MemoryStore {
    async fn get_name(&self, name: &[u8]) -> Result<Option<NameRecord>> {
        let inner = self.read()?;
        Ok(inner.names.get(name).cloned())
    }

    async fn get_history(&self, name: &[u8]) -> Result<Vec<NameRecord>> {
        let inner = self.read()?;
        Ok(inner.history.get(name).cloned().unwrap_or_default())
    }

    async fn scan(&self, start: &[u8], count: usize) -> Result<Vec<NameRecord>> {
        let inner = self.read()?;
        let start = Bytes::copy_from_slice(start);
        Ok(inner
            .names
            .range(start..)
            .take(count)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn all_names(&self) -> Result<Vec<NameRecord>> {
        let inner = self.read()?;
        Ok(inner.names.values().cloned().collect())
    }

    async fn names_at_height(&self, height: Height) -> Result<Vec<NameRecord>> {
        let inner = self.read()?;
        Ok(inner
            .names
            .values()
            .filter(|record| record.height == height)
            .cloned()
            .collect())
    }

    async fn name_count(&self) -> Result<u64> {
        let inner = self.read()?;
        Ok(inner.names.len() as u64)
    }

    async fn apply_record(&self, record: &NameRecord) -> Result<ApplyResult> {
        let mut inner = self.write()?;

        let result = classify_apply(inner.names.get(&record.name), record)?;
        if result == ApplyResult::AlreadyApplied {
            return Ok(result);
        }

        inner.names.insert(record.name.clone(), record.clone());
        inner
            .history
            .entry(record.name.clone())
            .or_default()
            .push(record.clone());

        Ok(result)
    }

    async fn validate(&self) -> Result<()> {
        let inner = self.read()?;
        for (name, current) in &inner.names {
            let history = inner.history.get(name).map(Vec::as_slice).unwrap_or(&[]);
            check_history(current, history)?;
        }
        if inner.history.len() != inner.names.len() {
            return Err(StoreError::Inconsistent(
                "history exists for an unregistered name".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nameledger_core::{Address, Txid};

    fn record(name: &[u8], value: &[u8], height: Height) -> NameRecord {
        NameRecord {
            name: Bytes::copy_from_slice(name),
            value: Bytes::copy_from_slice(value),
            txid: Txid::from_bytes([height as u8; 32]),
            vout: 0,
            address: Address::new("nl1test"),
            height,
        }
    }

    #[tokio::test]
    async fn test_apply_and_get() {
        let store = MemoryStore::new();
        let r = record(b"d/abc", b"v1", 10);

        assert_eq!(store.apply_record(&r).await.unwrap(), ApplyResult::Inserted);
        assert_eq!(store.get_name(b"d/abc").await.unwrap(), Some(r.clone()));
        assert_eq!(store.get_name(b"d/abd").await.unwrap(), None);
        assert_eq!(
            store.apply_record(&r).await.unwrap(),
            ApplyResult::AlreadyApplied
        );
        assert_eq!(store.get_history(b"d/abc").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_name_output() {
        use crate::traits::StoreExt;
        use nameledger_core::{Commitment, NameOperation, NameState};

        let store = MemoryStore::new();
        let owner = Address::new("nl1test");
        let txid = Txid::from_bytes([3; 32]);

        let new = NameOperation::NameNew {
            commitment: Commitment::compute(&[1; 20], b"d/\xff"),
        };
        assert_eq!(store.apply_name_output(txid, 0, &new, &owner, 5).await.unwrap(), None);
        assert_eq!(store.confirmed_state(b"d/\xff").await.unwrap(), NameState::Uncommitted);

        // A name that only renders as hex in log output.
        let update = NameOperation::NameUpdate {
            name: Bytes::from_static(b"d/\xff"),
            value: Bytes::from_static(b"v"),
        };
        assert_eq!(
            store.apply_name_output(txid, 1, &update, &owner, 6).await.unwrap(),
            Some(ApplyResult::Inserted)
        );
        assert_eq!(store.confirmed_state(b"d/\xff").await.unwrap(), NameState::Confirmed);
        let current = store.get_name(b"d/\xff").await.unwrap().unwrap();
        assert_eq!((current.vout, current.height), (1, 6));
        assert_eq!(store.names_at_height(6).await.unwrap(), vec![current]);
    }

    #[tokio::test]
    async fn test_history_oldest_first() {
        let store = MemoryStore::new();
        store.apply_record(&record(b"d/abc", b"v1", 10)).await.unwrap();
        store.apply_record(&record(b"d/abc", b"v2", 12)).await.unwrap();

        let history = store.get_history(b"d/abc").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].value.as_ref(), b"v1");
        assert_eq!(history.last(), store.get_name(b"d/abc").await.unwrap().as_ref());
        store.validate().await.unwrap();
    }

    #[tokio::test]
    async fn test_out_of_order_apply_rejected() {
        let store = MemoryStore::new();
        store.apply_record(&record(b"d/abc", b"v1", 10)).await.unwrap();
        let err = store.apply_record(&record(b"d/abc", b"v0", 9)).await.unwrap_err();
        assert!(matches!(err, StoreError::OutOfOrder { current: 10, got: 9 }));
    }

    #[tokio::test]
    async fn test_scan_orders_by_bytes() {
        let store = MemoryStore::new();
        for name in [&b"d/b"[..], b"", b"d/a", b"\xff", b"d/"] {
            store.apply_record(&record(name, b"v", 1)).await.unwrap();
        }

        let names: Vec<Bytes> = store
            .scan(b"", 10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(
            names,
            vec![
                Bytes::from_static(b""),
                Bytes::from_static(b"d/"),
                Bytes::from_static(b"d/a"),
                Bytes::from_static(b"d/b"),
                Bytes::from_static(b"\xff"),
            ]
        );

        let from_a = store.scan(b"d/a", 2).await.unwrap();
        assert_eq!(from_a.len(), 2);
        assert_eq!(from_a[0].name.as_ref(), b"d/a");
        assert_eq!(from_a[1].name.as_ref(), b"d/b");
        assert_eq!(store.name_count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_names_at_height() {
        let store = MemoryStore::new();
        store.apply_record(&record(b"d/a", b"v", 5)).await.unwrap();
        store.apply_record(&record(b"d/b", b"v", 6)).await.unwrap();
        store.apply_record(&record(b"d/a", b"v2", 6)).await.unwrap();

        assert!(store.names_at_height(5).await.unwrap().is_empty());
        assert_eq!(store.names_at_height(6).await.unwrap().len(), 2);
    }
}
