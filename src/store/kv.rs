// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use thiserror::Error;
use tracing::debug;

const STORE_SCHEMA_VERSION: u32 = 1;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    key BLOB PRIMARY KEY,
    value BLOB NOT NULL
) WITHOUT ROWID;";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unsupported store schema version {version} at {path:?}")]
    UnsupportedVersion { path: PathBuf, version: u32 },
    #[error("refusing to open store through symlink at {path:?}")]
    SymlinkRefused { path: PathBuf },
    #[error("transaction aborted: {reason}")]
    Aborted { reason: String },
}

/// Read access inside a transaction.
pub trait ReadTxn {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// All entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}

/// Read-write access inside a transaction. Reads observe the transaction's own staged writes.
pub trait WriteTxn: ReadTxn {
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StoreError>;
    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;
}

/// Transactional key/value storage.
///
/// `view` runs against a consistent snapshot. `update` is a unit of work: staged writes become
/// visible (and durable, for persistent stores) only if the closure returns `Ok`.
pub trait KeyStore: Send + Sync + 'static {
    fn view<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T, StoreError>;

    fn update<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T, StoreError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Fast, best-effort persistence.
    ///
    /// - WAL journal with `synchronous=NORMAL`.
    /// - A commit survives a process crash but may be lost on power failure.
    #[default]
    BestEffort,

    /// Slower, best-effort durability.
    ///
    /// `synchronous=FULL`: every commit syncs the WAL before returning. Exact guarantees are
    /// platform/filesystem-dependent.
    Durable,
}

impl WriteDurability {
    fn synchronous(self) -> &'static str {
        match self {
            Self::BestEffort => "NORMAL",
            Self::Durable => "FULL",
        }
    }
}

/// Embedded key/value store on a single SQLite table.
///
/// One connection behind a mutex serializes transactions. A commit writes only the rows it
/// touched.
#[derive(Debug)]
pub struct SqliteKeyStore {
    path: Option<PathBuf>,
    durability: WriteDurability,
    conn: Mutex<Connection>,
}

impl SqliteKeyStore {
    pub const FILE_NAME: &'static str = "store.db";

    /// Opens (or creates) the database file inside `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(Self::FILE_NAME);
        refuse_symlink(&path)?;

        let conn = Connection::open(&path)?;
        let version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        match version {
            0 | STORE_SCHEMA_VERSION => {}
            version => return Err(StoreError::UnsupportedVersion { path, version }),
        }

        let store = Self::init(conn, Some(path))?;
        debug!(path = ?store.path, "opened key store");
        Ok(store)
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, StoreError> {
        let durability = WriteDurability::default();
        conn.execute_batch(&format!(
            "PRAGMA journal_mode=WAL;\nPRAGMA synchronous={};\n{SCHEMA}",
            durability.synchronous()
        ))?;
        conn.pragma_update(None, "user_version", STORE_SCHEMA_VERSION)?;

        Ok(Self {
            path,
            durability,
            conn: Mutex::new(conn),
        })
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Result<Self, StoreError> {
        self.lock()
            .execute_batch(&format!("PRAGMA synchronous={};", durability.synchronous()))?;
        self.durability = durability;
        Ok(self)
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .lock()
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyStore for SqliteKeyStore {
    fn view<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T, StoreError>,
    {
        let mut conn = self.lock();
        let txn = SqliteTxn(conn.transaction_with_behavior(TransactionBehavior::Deferred)?);
        f(&txn)
    }

    fn update<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T, StoreError>,
    {
        let mut conn = self.lock();
        let mut txn = SqliteTxn(conn.transaction_with_behavior(TransactionBehavior::Immediate)?);
        let out = f(&mut txn)?;
        txn.0.commit()?;
        Ok(out)
    }
}

/// Dropping without `commit` rolls back.
struct SqliteTxn<'c>(Transaction<'c>);

impl ReadTxn for SqliteTxn<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let mut stmt = self.0.prepare_cached("SELECT value FROM kv WHERE key = ?1")?;
        Ok(stmt
            .query_row(params![key], |row| row.get::<_, Vec<u8>>(0))
            .optional()?)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut stmt = self
            .0
            .prepare_cached("SELECT key, value FROM kv WHERE key >= ?1 ORDER BY key")?;
        let mut rows = stmt.query(params![prefix])?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let key: Vec<u8> = row.get(0)?;
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key, row.get(1)?));
        }
        Ok(entries)
    }
}

impl WriteTxn for SqliteTxn<'_> {
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StoreError> {
        self.0
            .prepare_cached("INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)")?
            .execute(params![key, value])?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.0
            .prepare_cached("DELETE FROM kv WHERE key = ?1")?
            .execute(params![key])?;
        Ok(())
    }
}

fn refuse_symlink(path: &Path) -> Result<(), StoreError> {
    match fs::symlink_metadata(path) {
        Ok(md) if md.file_type().is_symlink() => Err(StoreError::SymlinkRefused {
            path: path.to_path_buf(),
        }),
        Ok(_) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
