//! Core storage operations using RocksDB.
//!
//! Provides low-level get/put/batch/scan operations with column family
//! support, plus point-in-time snapshots for repeatable reads.

use crate::config::StorageOptions;
use crate::types::{IndexError, Result};
use rocksdb::{BoundColumnFamily, IteratorMode, Snapshot, WriteBatch, WriteOptions, DB};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::batch::IndexBatch;
use super::column_families::create_column_family_descriptors;

/// Storage wrapper around one index's RocksDB directory.
///
/// Thread-safe; clones share the same underlying database.
#[derive(Clone)]
pub struct Storage {
    db: Arc<DB>,
    path: PathBuf,
    sync_writes: bool,
}

impl Storage {
    /// Open database at path with column families.
    ///
    /// Creates the database and column families if they don't exist.
    ///
    /// # Arguments
    ///
    /// * `path` - Index directory path
    /// * `options` - Storage tuning
    ///
    /// # Errors
    ///
    /// Returns `IndexError::StorageUnavailable` if RocksDB fails to open
    pub fn open<P: AsRef<Path>>(path: P, options: &StorageOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = DB::open_cf_descriptors(
            &options.db_options(),
            &path,
            create_column_family_descriptors(options),
        )?;

        Ok(Self {
            db: Arc::new(db),
            path,
            sync_writes: options.sync_writes,
        })
    }

    /// Remove an index directory and everything in it.
    ///
    /// The database must not be open anywhere in the process.
    pub fn destroy<P: AsRef<Path>>(path: P, options: &StorageOptions) -> Result<()> {
        DB::destroy(&options.db_options(), path.as_ref())?;
        Ok(())
    }

    /// Get column family handle.
    pub fn cf_handle(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| IndexError::InternalError(format!("CF not found: {}", name)))
    }

    /// Get value from column family.
    pub fn get(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf_handle(cf_name)?;
        Ok(self.db.get_cf(&cf, key)?)
    }

    /// Get value from column family as of `snapshot`.
    pub fn get_at(&self, snapshot: &Snapshot<'_>, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf_handle(cf_name)?;
        Ok(snapshot.get_cf(&cf, key)?)
    }

    /// Put a single value, bypassing any batch.
    pub fn put(&self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.cf_handle(cf_name)?;
        Ok(self.db.put_cf_opt(&cf, key, value, &self.write_options())?)
    }

    /// Write staged operations atomically into `cf_name`.
    ///
    /// The staged batch is left untouched; the caller clears it once the
    /// write succeeded.
    pub fn write_batch(&self, cf_name: &str, batch: &IndexBatch) -> Result<()> {
        let cf = self.cf_handle(cf_name)?;
        self.write(batch.to_write_batch(&cf))
    }

    /// Write a RocksDB batch atomically.
    pub fn write(&self, batch: WriteBatch) -> Result<()> {
        Ok(self.db.write_opt(batch, &self.write_options())?)
    }

    /// All keys of a column family, in key order.
    pub fn keys(&self, cf_name: &str) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf_handle(cf_name)?;
        let mut keys = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, _) = item?;
            keys.push(key.to_vec());
        }
        Ok(keys)
    }

    /// All key/value pairs of a column family, in key order.
    pub fn entries(&self, cf_name: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let cf = self.cf_handle(cf_name)?;
        self.db
            .iterator_cf(&cf, IteratorMode::Start)
            .map(|item| -> Result<(Vec<u8>, Vec<u8>)> {
                let (key, value) = item?;
                Ok((key.to_vec(), value.to_vec()))
            })
            .collect()
    }

    /// Create database snapshot for consistent reads.
    ///
    /// The snapshot is released when the returned handle is dropped.
    pub fn snapshot(&self) -> Snapshot<'_> {
        self.db.snapshot()
    }

    /// Index directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_options(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.sync_writes);
        opts
    }
}
