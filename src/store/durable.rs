//! Resumable-mode region: every call commits durably before it returns.

use redb::{Database, Durability};
use std::sync::Arc;
use tracing::debug;

use super::{
    count_entries, insert_entries, pop_first_entries, remove_keys, scan_values, with_write,
    OrderedStore, StoreError,
};
use crate::config::DurabilityMode;
use crate::key_encoder::FrontierKey;

pub struct DurableStore {
    db: Arc<Database>,
    region: String,
}

impl DurableStore {
    pub fn new(db: Arc<Database>, region: impl Into<String>) -> Self {
        Self {
            db,
            region: region.into(),
        }
    }
}

impl OrderedStore for DurableStore {
    fn region(&self) -> &str {
        &self.region
    }

    fn mode(&self) -> DurabilityMode {
        DurabilityMode::Resumable
    }

    fn put(&self, key: &FrontierKey, value: &[u8]) -> Result<(), StoreError> {
        self.put_all(&[(*key, value)])
    }

    fn put_all(&self, entries: &[(FrontierKey, &[u8])]) -> Result<(), StoreError> {
        with_write(&self.db, Durability::Immediate, |txn| {
            insert_entries(txn, &self.region, entries)
        })
    }

    fn scan(&self, max: usize) -> Result<Vec<Vec<u8>>, StoreError> {
        scan_values(&self.db, &self.region, max)
    }

    fn delete_first(&self, count: usize) -> Result<usize, StoreError> {
        with_write(&self.db, Durability::Immediate, |txn| {
            pop_first_entries(txn, &self.region, count)
        })
    }

    fn remove(&self, keys: &[FrontierKey]) -> Result<usize, StoreError> {
        with_write(&self.db, Durability::Immediate, |txn| {
            remove_keys(txn, &self.region, keys)
        })
    }

    fn count(&self) -> Result<u64, StoreError> {
        count_entries(&self.db, &self.region)
    }

    fn close(self: Box<Self>) -> Result<(), StoreError> {
        // Nothing buffered: each commit above was already durable.
        debug!(region = %self.region, "Closing durable region");
        Ok(())
    }
}
