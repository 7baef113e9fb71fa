use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::config::DurabilityMode;
use crate::key_encoder::FrontierKey;
use crate::models::UrlRecord;
use crate::store::{OrderedStore, StoreError};

/// Persistent priority queue of URLs waiting to be crawled.
///
/// Records come back in ascending `(priority, depth, docid)` order. Shared
/// across worker threads by reference or `Arc`; traversals and writes are
/// serialized by one lock, while `length` reads without it.
pub struct Frontier {
    store: Box<dyn OrderedStore>,
    lock: Mutex<()>,
}

impl Frontier {
    pub fn new(store: Box<dyn OrderedStore>) -> Self {
        info!(region = %store.region(), mode = %store.mode(), "Frontier opened");
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    pub fn region(&self) -> &str {
        self.store.region()
    }

    pub fn mode(&self) -> DurabilityMode {
        self.store.mode()
    }

    /// Write one record under its sort key.
    ///
    /// Resumable frontiers have committed durably once this returns. A record
    /// with the same key as an existing one replaces it.
    pub fn enqueue(&self, record: &UrlRecord) -> Result<(), StoreError> {
        let value = record.encode()?;
        let key = record.key();

        let _guard = self.lock.lock();
        self.store.put(&key, &value)?;
        debug!(%key, url = %record.canonical_url, "Enqueued");
        Ok(())
    }

    /// Write a batch of records in a single transaction.
    pub fn enqueue_all(&self, records: &[UrlRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let encoded = records
            .iter()
            .map(|record| Ok((record.key(), record.encode()?)))
            .collect::<Result<Vec<_>, StoreError>>()?;
        let entries: Vec<(FrontierKey, &[u8])> = encoded
            .iter()
            .map(|(key, value)| (*key, value.as_slice()))
            .collect();

        let _guard = self.lock.lock();
        self.store.put_all(&entries)?;
        debug!(count = records.len(), "Enqueued batch");
        Ok(())
    }

    /// Up to `max` records from the front of the queue, left in place.
    pub fn peek_batch(&self, max: usize) -> Result<Vec<UrlRecord>, StoreError> {
        let values = {
            let _guard = self.lock.lock();
            self.store.scan(max)?
        };

        values
            .iter()
            .map(|bytes| UrlRecord::decode(bytes).map_err(StoreError::from))
            .collect()
    }

    /// Remove the `count` front-most records. Returns how many were removed.
    pub fn delete_batch(&self, count: usize) -> Result<usize, StoreError> {
        let _guard = self.lock.lock();
        let removed = self.store.delete_first(count)?;
        debug!(requested = count, removed, "Deleted batch");
        Ok(removed)
    }

    /// Remove exactly the given records, typically a batch returned by
    /// [`Frontier::peek_batch`]. Records enqueued since the peek stay queued.
    pub fn retire(&self, records: &[UrlRecord]) -> Result<usize, StoreError> {
        let keys: Vec<FrontierKey> = records.iter().map(UrlRecord::key).collect();

        let _guard = self.lock.lock();
        let removed = self.store.remove(&keys)?;
        debug!(requested = keys.len(), removed, "Retired records");
        Ok(removed)
    }

    /// Number of queued entries, or -1 if the store could not be read.
    pub fn length(&self) -> i64 {
        match self.store.count() {
            Ok(count) => i64::try_from(count).unwrap_or(i64::MAX),
            Err(e) => {
                error!(region = %self.region(), error = %e, "Failed to count frontier entries");
                -1
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    pub fn stats(&self) -> FrontierStats {
        FrontierStats {
            region: self.region().to_string(),
            mode: self.mode(),
            queued: self.length(),
        }
    }

    /// Release the underlying store. Volatile frontiers are flushed to disk
    /// first. Failures are logged, never returned.
    pub fn close(self) {
        let region = self.region().to_string();
        match self.store.close() {
            Ok(()) => info!(%region, "Frontier closed"),
            Err(e) => error!(%region, error = %e, "Failed to close frontier"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrontierStats {
    pub region: String,
    pub mode: DurabilityMode,
    /// -1 when the store could not be read.
    pub queued: i64,
}

impl std::fmt::Display for FrontierStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Frontier {}: {} queued URLs ({})",
            self.region, self.queued, self.mode
        )
    }
}
