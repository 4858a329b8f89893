//! Snapshot-bound index reader.
//!
//! A reader captures a RocksDB snapshot when it is created and answers every
//! lookup against it, so its view never changes while writers commit new
//! batches (repeatable read). The snapshot is released by `close()` or, on
//! every other exit path, when the reader is dropped.

use super::codec;
use crate::otel::{db_span, record_db_metrics, DbOperation};
use crate::storage::{Storage, CF_POSTINGS};
use crate::types::{IndexError, IndexValue, Result};
use rocksdb::Snapshot;

/// Point-in-time reader over one index.
pub struct IndexReader<'a> {
    index_id: u64,
    storage: &'a Storage,
    snapshot: Option<Snapshot<'a>>,
}

impl<'a> IndexReader<'a> {
    /// Create a reader, capturing a snapshot of committed state immediately.
    pub fn new(index_id: u64, storage: &'a Storage) -> Self {
        Self {
            index_id,
            storage,
            snapshot: Some(storage.snapshot()),
        }
    }

    /// Entity ids indexed under `value` as of the snapshot.
    ///
    /// # Returns
    ///
    /// Fully materialized ids in posting order; empty if the value has no entry
    ///
    /// # Errors
    ///
    /// - `IndexError::ReaderClosed` after `close()`
    /// - `IndexError::CorruptEncoding` if the stored list does not decode
    /// - `IndexError::StorageUnavailable` if RocksDB fails
    pub fn lookup(&self, value: &IndexValue) -> Result<Vec<u64>> {
        let snapshot = self.snapshot.as_ref().ok_or(IndexError::ReaderClosed)?;

        let span = db_span(DbOperation::Lookup, self.index_id);
        let _guard = span.enter();

        let key = codec::encode_value(value)?;
        let ids = match self.storage.get_at(snapshot, CF_POSTINGS, &key)? {
            Some(bytes) => codec::decode_ids(&bytes)?,
            None => Vec::new(),
        };

        record_db_metrics(Some(ids.len()), None);
        Ok(ids)
    }

    /// Release the snapshot. Later lookups fail with `ReaderClosed`.
    pub fn close(&mut self) {
        self.snapshot = None;
    }

    pub fn is_closed(&self) -> bool {
        self.snapshot.is_none()
    }

    pub fn index_id(&self) -> u64 {
        self.index_id
    }
}
