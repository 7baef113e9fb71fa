//! Volatile-mode region: commits skip fsync and become durable periodically
//! and on close.
//!
//! redb keeps non-durable commits visible to later transactions, so reads
//! behave exactly like the durable store. Pages freed by non-durable commits
//! are only reclaimed after a durable one, so every `flush_interval`-th write
//! commits durably. A crash loses everything since the last durable commit.

use redb::{Database, Durability};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use super::{
    count_entries, insert_entries, pop_first_entries, remove_keys, scan_values, with_write,
    OrderedStore, StoreError,
};
use crate::config::{Config, DurabilityMode};
use crate::key_encoder::FrontierKey;

pub struct DeferredStore {
    db: Arc<Database>,
    region: String,
    flush_interval: u64,
    commits: AtomicU64,
}

impl DeferredStore {
    pub fn new(db: Arc<Database>, region: impl Into<String>) -> Self {
        Self::with_flush_interval(db, region, Config::DEFERRED_FLUSH_INTERVAL)
    }

    /// `flush_interval` of 0 is treated as 1 (every commit durable).
    pub fn with_flush_interval(
        db: Arc<Database>,
        region: impl Into<String>,
        flush_interval: u64,
    ) -> Self {
        Self {
            db,
            region: region.into(),
            flush_interval: flush_interval.max(1),
            commits: AtomicU64::new(0),
        }
    }

    /// Persist every deferred commit made so far.
    pub fn flush(&self) -> Result<(), StoreError> {
        with_write(&self.db, Durability::Immediate, |_txn| Ok(()))
    }

    /// Durability for the next write commit.
    fn next_durability(&self) -> Durability {
        let commit = self.commits.fetch_add(1, Ordering::Relaxed) + 1;
        if commit % self.flush_interval == 0 {
            trace!(region = %self.region, commit, "Periodic durable commit");
            Durability::Immediate
        } else {
            Durability::None
        }
    }
}

impl OrderedStore for DeferredStore {
    fn region(&self) -> &str {
        &self.region
    }

    fn mode(&self) -> DurabilityMode {
        DurabilityMode::Volatile
    }

    fn put(&self, key: &FrontierKey, value: &[u8]) -> Result<(), StoreError> {
        self.put_all(&[(*key, value)])
    }

    fn put_all(&self, entries: &[(FrontierKey, &[u8])]) -> Result<(), StoreError> {
        with_write(&self.db, self.next_durability(), |txn| {
            insert_entries(txn, &self.region, entries)
        })
    }

    fn scan(&self, max: usize) -> Result<Vec<Vec<u8>>, StoreError> {
        scan_values(&self.db, &self.region, max)
    }

    fn delete_first(&self, count: usize) -> Result<usize, StoreError> {
        with_write(&self.db, self.next_durability(), |txn| {
            pop_first_entries(txn, &self.region, count)
        })
    }

    fn remove(&self, keys: &[FrontierKey]) -> Result<usize, StoreError> {
        with_write(&self.db, self.next_durability(), |txn| {
            remove_keys(txn, &self.region, keys)
        })
    }

    fn count(&self) -> Result<u64, StoreError> {
        count_entries(&self.db, &self.region)
    }

    fn close(self: Box<Self>) -> Result<(), StoreError> {
        self.flush()?;
        debug!(region = %self.region, "Flushed deferred region on close");
        Ok(())
    }
}
