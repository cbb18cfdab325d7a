use crate::{merge_signatures, SignatureStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cosign_types::{CosignError, Envelope, Result, TxIdentity};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// SQLite-backed signature store. One table, keyed by the 32-byte identity.
///
/// Merges run inside an `IMMEDIATE` transaction, so the read-modify-write for
/// an identity is atomic even if another process shares the file.
#[derive(Clone)]
pub struct SqliteSignatureStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSignatureStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            CosignError::StorageError(format!("Failed to open database {}: {}", path.display(), e))
        })?;

        let store = Self::from_connection(conn)?;
        info!("Signature store opened at {}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            CosignError::StorageError(format!("Failed to open in-memory database: {}", e))
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA synchronous = FULL;
             CREATE TABLE IF NOT EXISTS txs (
                 id BLOB PRIMARY KEY,
                 envelope BLOB NOT NULL,
                 first_seen INTEGER NOT NULL,
                 updated_at INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS txs_updated_at ON txs (updated_at);",
        )
        .map_err(|e| CosignError::StorageError(format!("Failed to create schema: {}", e)))?;

        debug!("Signature store schema initialized");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| CosignError::StorageError(format!("Lock error: {}", e)))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| CosignError::StorageError(format!("Storage task failed: {}", e)))?
    }
}

fn storage_err(context: &'static str) -> impl Fn(rusqlite::Error) -> CosignError {
    move |e| CosignError::StorageError(format!("{}: {}", context, e))
}

fn decode_record(identity: &TxIdentity, bytes: &[u8]) -> Result<Envelope> {
    Envelope::from_xdr(bytes).map_err(|e| CosignError::CorruptRecord {
        identity: *identity,
        reason: e.to_string(),
    })
}

fn merge_blocking(conn: &mut Connection, identity: &TxIdentity, incoming: Envelope) -> Result<Envelope> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(storage_err("beginning transaction"))?;

    let stored: Option<Vec<u8>> = tx
        .query_row(
            "SELECT envelope FROM txs WHERE id = ?1",
            params![&identity.0[..]],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| CosignError::StorageError(format!("reading tx {}: {}", identity, e)))?;

    let merged = match stored {
        None => incoming,
        Some(bytes) => merge_signatures(incoming, &decode_record(identity, &bytes)?)?,
    };

    let encoded = merged.to_xdr()?;
    let now = Utc::now().timestamp_millis();

    tx.execute(
        "INSERT INTO txs (id, envelope, first_seen, updated_at) VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(id) DO UPDATE SET envelope = excluded.envelope, updated_at = excluded.updated_at",
        params![&identity.0[..], encoded, now],
    )
    .map_err(|e| CosignError::StorageError(format!("storing tx {}: {}", identity, e)))?;

    tx.commit()
        .map_err(|e| CosignError::StorageError(format!("committing tx {}: {}", identity, e)))?;

    Ok(merged)
}

#[async_trait]
impl SignatureStore for SqliteSignatureStore {
    async fn merge_and_persist(&self, identity: &TxIdentity, incoming: Envelope) -> Result<Envelope> {
        let identity = *identity;
        self.with_conn(move |conn| merge_blocking(conn, &identity, incoming))
            .await
    }

    async fn get(&self, identity: &TxIdentity) -> Result<Option<Envelope>> {
        let identity = *identity;
        self.with_conn(move |conn| {
            let stored: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT envelope FROM txs WHERE id = ?1",
                    params![&identity.0[..]],
                    |row| row.get(0),
                )
                .optional()
                .map_err(storage_err("reading tx"))?;

            stored.map(|bytes| decode_record(&identity, &bytes)).transpose()
        })
        .await
    }

    async fn len(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM txs", [], |row| row.get(0))
                .map_err(storage_err("counting txs"))?;
            Ok(count as usize)
        })
        .await
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let cutoff = cutoff.timestamp_millis();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM txs WHERE updated_at < ?1", params![cutoff])
                .map_err(storage_err("pruning txs"))
        })
        .await
    }
}
