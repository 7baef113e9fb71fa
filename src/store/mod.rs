//! Durable ordered key-value storage behind the frontier.
//!
//! One redb file per crawl holds one table ("region") per logical queue. The
//! durability mode picks which [`OrderedStore`] implementation a region gets.

mod deferred;
mod durable;

pub use deferred::DeferredStore;
pub use durable::DurableStore;

use redb::{
    Database, Durability, ReadableTable, ReadableTableMetadata, TableDefinition, WriteTransaction,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{DurabilityMode, FrontierConfig};
use crate::frontier::Frontier;
use crate::key_encoder::FrontierKey;
use crate::models::RecordError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Database error: {0}")]
    Redb(#[from] redb::Error),

    #[error("Database creation error: {0}")]
    RedbCreate(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),
}

/// Ordered key-value capability the frontier is written against.
///
/// Keys compare byte-wise. Every method runs in its own transaction and
/// either completes or leaves the region untouched.
pub trait OrderedStore: Send + Sync {
    /// Name of the table this store reads and writes.
    fn region(&self) -> &str;

    fn mode(&self) -> DurabilityMode;

    fn put(&self, key: &FrontierKey, value: &[u8]) -> Result<(), StoreError>;

    fn put_all(&self, entries: &[(FrontierKey, &[u8])]) -> Result<(), StoreError>;

    /// Values of the first `max` non-empty entries in ascending key order.
    fn scan(&self, max: usize) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Remove the first `count` entries. Returns how many were removed.
    fn delete_first(&self, count: usize) -> Result<usize, StoreError>;

    /// Remove exactly these keys. Returns how many existed.
    fn remove(&self, keys: &[FrontierKey]) -> Result<usize, StoreError>;

    fn count(&self) -> Result<u64, StoreError>;

    fn close(self: Box<Self>) -> Result<(), StoreError>;
}

/// Session handle owning the frontier database file.
///
/// Cheap to share: every region opened from it holds an `Arc` to the same
/// database, which is released once the session and all its regions are gone.
pub struct CrawlStore {
    db: Arc<Database>,
    mode: DurabilityMode,
    flush_interval: u64,
    path: PathBuf,
}

impl CrawlStore {
    /// Open (or create) the store described by `config`.
    pub fn open(config: &FrontierConfig) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&config.storage_folder)?;

        let path = config.store_path();
        let db = Database::create(&path)?;
        let mode = config.mode();

        info!(path = %path.display(), %mode, "Opened frontier store");

        Ok(Self {
            db: Arc::new(db),
            mode,
            flush_interval: config.flush_interval,
            path,
        })
    }

    /// Open the store after discarding whatever a previous crawl left behind.
    pub fn open_fresh(config: &FrontierConfig) -> Result<Self, StoreError> {
        let path = config.store_path();
        if path.exists() {
            std::fs::remove_file(&path)?;
            info!(path = %path.display(), "Discarded previous frontier state");
        }
        Self::open(config)
    }

    pub fn mode(&self) -> DurabilityMode {
        self.mode
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a region, creating its table on first use.
    pub fn open_store(&self, region: &str) -> Result<Box<dyn OrderedStore>, StoreError> {
        // Create the table up front so read transactions never miss it.
        with_write(&self.db, Durability::Immediate, |txn| {
            txn.open_table(region_table(region))?;
            Ok(())
        })?;

        let store: Box<dyn OrderedStore> = match self.mode {
            DurabilityMode::Resumable => Box::new(DurableStore::new(Arc::clone(&self.db), region)),
            DurabilityMode::Volatile => Box::new(DeferredStore::with_flush_interval(
                Arc::clone(&self.db),
                region,
                self.flush_interval,
            )),
        };
        Ok(store)
    }

    /// Open a region and wrap it in a [`Frontier`].
    pub fn open_frontier(&self, region: &str) -> Result<Frontier, StoreError> {
        Ok(Frontier::new(self.open_store(region)?))
    }
}

// ============================================================================
// SHARED REDB OPERATIONS
// ============================================================================

fn region_table(region: &str) -> TableDefinition<'_, &'static [u8], &'static [u8]> {
    TableDefinition::new(region)
}

/// Run `op` in a write transaction: commit on `Ok`, abort on `Err`.
fn with_write<T>(
    db: &Database,
    durability: Durability,
    op: impl FnOnce(&WriteTransaction) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let mut txn = db.begin_write()?;
    txn.set_durability(durability);

    match op(&txn) {
        Ok(value) => {
            txn.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(abort_err) = txn.abort() {
                warn!(error = %abort_err, "Abort failed after store error");
            }
            Err(err)
        }
    }
}

fn insert_entries(
    txn: &WriteTransaction,
    region: &str,
    entries: &[(FrontierKey, &[u8])],
) -> Result<(), StoreError> {
    let mut table = txn.open_table(region_table(region))?;
    for (key, value) in entries {
        table.insert(key.as_bytes(), *value)?;
    }
    Ok(())
}

fn pop_first_entries(
    txn: &WriteTransaction,
    region: &str,
    count: usize,
) -> Result<usize, StoreError> {
    let mut table = txn.open_table(region_table(region))?;
    let mut removed = 0;
    while removed < count {
        if table.pop_first()?.is_none() {
            break;
        }
        removed += 1;
    }
    Ok(removed)
}

fn remove_keys(
    txn: &WriteTransaction,
    region: &str,
    keys: &[FrontierKey],
) -> Result<usize, StoreError> {
    let mut table = txn.open_table(region_table(region))?;
    let mut removed = 0;
    for key in keys {
        if table.remove(key.as_bytes())?.is_some() {
            removed += 1;
        }
    }
    Ok(removed)
}

fn scan_values(db: &Database, region: &str, max: usize) -> Result<Vec<Vec<u8>>, StoreError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(region_table(region))?;

    let mut values = Vec::with_capacity(max.min(1024));
    for entry in table.iter()? {
        if values.len() >= max {
            break;
        }
        let (_key, value) = entry?;
        let bytes = value.value();
        // Empty values are tombstones.
        if bytes.is_empty() {
            continue;
        }
        values.push(bytes.to_vec());
    }

    Ok(values)
}

fn count_entries(db: &Database, region: &str) -> Result<u64, StoreError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(region_table(region))?;
    Ok(table.len()?)
}

/// Store whose every operation fails, for exercising error paths.
#[cfg(test)]
pub(crate) struct FailingStore;

#[cfg(test)]
impl FailingStore {
    fn error() -> StoreError {
        StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"))
    }
}

#[cfg(test)]
impl OrderedStore for FailingStore {
    fn region(&self) -> &str {
        "failing"
    }

    fn mode(&self) -> DurabilityMode {
        DurabilityMode::Resumable
    }

    fn put(&self, _key: &FrontierKey, _value: &[u8]) -> Result<(), StoreError> {
        Err(Self::error())
    }

    fn put_all(&self, _entries: &[(FrontierKey, &[u8])]) -> Result<(), StoreError> {
        Err(Self::error())
    }

    fn scan(&self, _max: usize) -> Result<Vec<Vec<u8>>, StoreError> {
        Err(Self::error())
    }

    fn delete_first(&self, _count: usize) -> Result<usize, StoreError> {
        Err(Self::error())
    }

    fn remove(&self, _keys: &[FrontierKey]) -> Result<usize, StoreError> {
        Err(Self::error())
    }

    fn count(&self) -> Result<u64, StoreError> {
        Err(Self::error())
    }

    fn close(self: Box<Self>) -> Result<(), StoreError> {
        Err(Self::error())
    }
}
