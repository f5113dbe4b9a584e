//! SQLite implementation of the NameStore trait.
//!
//! This is the persistent backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use nameledger_core::{Address, Height, NameRecord, Txid};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{check_history, classify_apply, ApplyResult, NameStore};

const RECORD_COLUMNS: &str = "name, value, txid, vout, address, height";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

// Helper to convert a row to NameRecord
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<NameRecord> {
    let name: Vec<u8> = row.get("name")?;
    let value: Vec<u8> = row.get("value")?;
    let txid_bytes: Vec<u8> = row.get("txid")?;
    let txid = Txid::try_from(txid_bytes.as_slice())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Blob, Box::new(e)))?;

    Ok(NameRecord {
        name: Bytes::from(name),
        value: Bytes::from(value),
        txid,
        vout: row.get("vout")?,
        address: Address::new(row.get::<_, String>("address")?),
        height: row.get("height")?,
    })
}

fn query_records(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<NameRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let records = stmt
        .query_map(params, row_to_record)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

fn current_record(conn: &Connection, name: &[u8]) -> Result<Option<NameRecord>> {
    let sql = format!("SELECT {} FROM names WHERE name = ?1", RECORD_COLUMNS);
    Ok(conn
        .query_row(&sql, params![name], row_to_record)
        .optional()?)
}

#[async_trait]
impl NameStore for SqliteStore {
    async fn get_name(&self, name: &[u8]) -> Result<Option<NameRecord>> {
        let name = name.to_vec();
        self.blocking(move |conn| current_record(conn, &name)).await
    }

    async fn get_history(&self, name: &[u8]) -> Result<Vec<NameRecord>> {
        let name = name.to_vec();
        self.blocking(move |conn| {
            let sql = format!(
                "SELECT {} FROM name_history WHERE name = ?1 ORDER BY seq",
                RECORD_COLUMNS
            );
            query_records(conn, &sql, params![name])
        })
        .await
    }

    async fn scan(&self, start: &[u8], count: usize) -> Result<Vec<NameRecord>> {
        let start = start.to_vec();
        let limit = i64::try_from(count).unwrap_or(i64::MAX);
        self.blocking(move |conn| {
            let sql = format!(
                "SELECT {} FROM names WHERE name >= ?1 ORDER BY name LIMIT ?2",
                RECORD_COLUMNS
            );
            query_records(conn, &sql, params![start, limit])
        })
        .await
    }

    async fn all_names(&self) -> Result<Vec<NameRecord>> {
        self.blocking(|conn| {
            let sql = format!("SELECT {} FROM names ORDER BY name", RECORD_COLUMNS);
            query_records(conn, &sql, [])
        })
        .await
    }

    async fn names_at_height(&self, height: Height) -> Result<Vec<NameRecord>> {
        self.blocking(move |conn| {
            let sql = format!(
                "SELECT {} FROM names WHERE height = ?1 ORDER BY name",
                RECORD_COLUMNS
            );
            query_records(conn, &sql, params![height])
        })
        .await
    }

    async fn name_count(&self) -> Result<u64> {
        self.blocking(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM names", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }

    async fn apply_record(&self, record: &NameRecord) -> Result<ApplyResult> {
        let record = record.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let current = current_record(&tx, &record.name)?;
            let result = classify_apply(current.as_ref(), &record)?;
            if result == ApplyResult::AlreadyApplied {
                return Ok(result);
            }

            tx.execute(
                "INSERT OR REPLACE INTO names (name, value, txid, vout, address, height)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.name.as_ref(),
                    record.value.as_ref(),
                    record.txid.as_bytes().as_slice(),
                    record.vout,
                    record.address.as_str(),
                    record.height,
                ],
            )?;

            let seq: i64 = tx.query_row(
                "SELECT COUNT(*) FROM name_history WHERE name = ?1",
                params![record.name.as_ref()],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO name_history (name, seq, value, txid, vout, address, height)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.name.as_ref(),
                    seq,
                    record.value.as_ref(),
                    record.txid.as_bytes().as_slice(),
                    record.vout,
                    record.address.as_str(),
                    record.height,
                ],
            )?;

            tx.commit()?;
            Ok(result)
        })
        .await
    }

    async fn validate(&self) -> Result<()> {
        self.blocking(|conn| {
            let sql = format!("SELECT {} FROM names ORDER BY name", RECORD_COLUMNS);
            let names = query_records(conn, &sql, [])?;

            let history_sql = format!(
                "SELECT {} FROM name_history WHERE name = ?1 ORDER BY seq",
                RECORD_COLUMNS
            );
            for current in &names {
                let history = query_records(conn, &history_sql, params![current.name.as_ref()])?;
                check_history(current, &history)?;
            }

            let with_history: i64 = conn.query_row(
                "SELECT COUNT(DISTINCT name) FROM name_history",
                [],
                |row| row.get(0),
            )?;
            if with_history as usize != names.len() {
                return Err(StoreError::Inconsistent(
                    "history exists for an unregistered name".into(),
                ));
            }
            Ok(())
        })
        .await
    }
}
