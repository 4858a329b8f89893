//! Index mutator: populator and online accessor in one.
//!
//! A mutator owns one index directory. Updates are applied as
//! read-modify-writes of posting lists against an in-memory batch which is
//! committed to RocksDB in a single atomic write.
//!
//! # Batching
//!
//! - `add` stages a single entry and leaves it pending (bulk population)
//! - `apply_updates` stages a whole stream and commits it, together with
//!   anything still pending, at the end of the call
//! - `force_flush` and `close` commit whatever is pending
//!
//! # Concurrency
//!
//! One writer per index at a time is the caller's contract. The batch sits
//! behind a mutex only so the mutator can be shared through the catalog.
//! Readers work on snapshots and never wait for writers.
//!
//! # Example
//!
//! ```rust,ignore
//! let mutator = IndexMutator::open(7, "./indexes/index-7", &StorageOptions::default())?;
//! mutator.apply_updates([PropertyUpdate::added(1, "x")])?;
//! mutator.complete_population(true)?;
//!
//! let reader = mutator.new_reader();
//! assert_eq!(reader.lookup(&"x".into())?, vec![1]);
//! ```

use super::codec;
use super::posting::PostingList;
use super::reader::IndexReader;
use super::state::IndexState;
use crate::config::StorageOptions;
use crate::otel::{db_span, record_db_metrics, DbOperation};
use crate::storage::keys::META_STATE_KEY;
use crate::storage::{IndexBatch, Staged, Storage, CF_META, CF_POSTINGS};
use crate::types::{IndexError, IndexValue, PropertyUpdate, Result, UpdateOp};
use std::borrow::Borrow;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Writer for one index.
pub struct IndexMutator {
    index_id: u64,
    storage: Storage,
    batch: Mutex<IndexBatch>,
    state: RwLock<IndexState>,
    closed: AtomicBool,
}

impl IndexMutator {
    /// Open (creating if missing) the index directory at `path`.
    ///
    /// The lifecycle state is restored from the metadata column family;
    /// a new directory starts `Populating`.
    ///
    /// # Errors
    ///
    /// - `IndexError::StorageUnavailable` if RocksDB fails to open
    /// - `IndexError::CorruptEncoding` if the persisted state is unreadable
    pub fn open<P: AsRef<Path>>(index_id: u64, path: P, options: &StorageOptions) -> Result<Self> {
        let span = db_span(DbOperation::Open, index_id);
        let _guard = span.enter();

        let storage = Storage::open(path, options)?;
        let state = match storage.get(CF_META, META_STATE_KEY)? {
            Some(bytes) => IndexState::decode(&bytes)?,
            None => IndexState::Populating,
        };

        debug!(index_id, %state, path = %storage.path().display(), "Opened index");

        Ok(Self {
            index_id,
            storage,
            batch: Mutex::new(IndexBatch::new()),
            state: RwLock::new(state),
            closed: AtomicBool::new(false),
        })
    }

    pub fn index_id(&self) -> u64 {
        self.index_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> IndexState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_online(&self) -> bool {
        self.state() == IndexState::Online
    }

    /// `true` once `close` or `drop_index` ran.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of keys staged but not yet committed.
    pub fn pending_writes(&self) -> usize {
        self.lock_batch().len()
    }

    /// Number of committed posting lists.
    pub fn entry_count(&self) -> Result<usize> {
        Ok(self.storage.keys(CF_POSTINGS)?.len())
    }

    /// Committed posting lists in key order, decoded.
    pub fn entries(&self) -> Result<Vec<(IndexValue, Vec<u64>)>> {
        self.storage
            .entries(CF_POSTINGS)?
            .into_iter()
            .map(|(key, value)| -> Result<(IndexValue, Vec<u64>)> {
                Ok((codec::decode_value(&key)?, codec::decode_ids(&value)?))
            })
            .collect()
    }

    /// Index directory path.
    pub fn path(&self) -> &Path {
        self.storage.path()
    }

    /// Stage `entity` under `value` without committing.
    ///
    /// Used while populating from a full scan; the entry becomes durable on
    /// the next `force_flush`, `apply_updates`, `complete_population(true)`
    /// or `close`.
    pub fn add(&self, entity: u64, value: &IndexValue) -> Result<()> {
        self.ensure_open()?;

        let mut batch = self.lock_batch();
        let mut layer = IndexBatch::new();
        self.stage_add(&batch, &mut layer, entity, value)?;
        batch.merge(layer);
        Ok(())
    }

    /// Apply a stream of property updates and commit them atomically.
    ///
    /// Each record is a read-modify-write of the affected posting lists;
    /// reads see writes staged earlier in the same call. `Changed` is a
    /// removal under the old value followed by an insertion under the new one.
    ///
    /// # Returns
    ///
    /// Number of update records applied
    ///
    /// # Errors
    ///
    /// - `IndexError::UnsupportedUpdateKind` for a record whose values do not
    ///   fit its mode; nothing from this call is committed
    /// - `IndexError::StorageUnavailable` if a read or the commit fails; the
    ///   caller may retry the whole stream
    /// - `IndexError::IndexClosed` after `close` or `drop_index`
    pub fn apply_updates<I>(&self, updates: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Borrow<PropertyUpdate>,
    {
        self.apply(DbOperation::Update, updates)
    }

    /// Online-path alias of `apply_updates`.
    pub fn update_and_commit<I>(&self, updates: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Borrow<PropertyUpdate>,
    {
        self.apply(DbOperation::Update, updates)
    }

    /// Replay updates after a crash.
    ///
    /// Behaves exactly like `apply_updates`: inserts and removals are
    /// idempotent on final state, so replaying already-applied records is safe.
    pub fn recover<I>(&self, updates: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Borrow<PropertyUpdate>,
    {
        self.apply(DbOperation::Recover, updates)
    }

    /// Commit and clear the pending batch without touching the state.
    ///
    /// # Returns
    ///
    /// Number of keys written
    pub fn force_flush(&self) -> Result<usize> {
        self.ensure_open()?;

        let span = db_span(DbOperation::Flush, self.index_id);
        let _guard = span.enter();

        let mut batch = self.lock_batch();
        let written = self.flush_locked(&mut batch)?;
        record_db_metrics(None, Some(written));
        Ok(written)
    }

    /// Delete every entry and reset the state to `Populating`.
    ///
    /// Called before a population starts from scratch.
    pub fn initialize_empty(&self) -> Result<usize> {
        self.ensure_open()?;

        let removed = self.clear_entries(Some(IndexState::Populating))?;
        info!(index_id = self.index_id, removed, "Initialized empty index");
        Ok(removed)
    }

    /// Delete every entry and metadata, then close the mutator.
    ///
    /// Allowed on a closed mutator, so a closed index can still be dropped.
    /// Entries and the persisted state go in one atomic write. Releasing the
    /// directory itself is up to the owner of the mutator (see
    /// `IndexProvider::drop_index`). Readers can still be created and see an
    /// empty index.
    pub fn drop_index(&self) -> Result<usize> {
        let removed = self.clear_entries(None)?;
        self.closed.store(true, Ordering::Release);
        info!(index_id = self.index_id, removed, "Dropped index");
        Ok(removed)
    }

    /// Signal the end of population.
    ///
    /// On success pending entries are committed and the index becomes
    /// `Online` (persisted). On failure the state stays `Populating`.
    ///
    /// # Returns
    ///
    /// The state after the call
    pub fn complete_population(&self, success: bool) -> Result<IndexState> {
        self.ensure_open()?;

        if !success {
            warn!(index_id = self.index_id, "Population failed, index stays populating");
            return Ok(self.state());
        }

        {
            let mut batch = self.lock_batch();
            self.flush_locked(&mut batch)?;
        }
        self.set_state(IndexState::Online)?;
        info!(index_id = self.index_id, "Index online");
        Ok(IndexState::Online)
    }

    /// Commit pending writes and close the mutator.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::IndexClosed` if already closed
    pub fn close(&self) -> Result<()> {
        self.ensure_open()?;

        {
            let mut batch = self.lock_batch();
            self.flush_locked(&mut batch)?;
        }
        self.closed.store(true, Ordering::Release);
        debug!(index_id = self.index_id, "Closed index");
        Ok(())
    }

    /// Reader over a fresh snapshot of committed state.
    ///
    /// Pending (uncommitted) writes are not visible to it. Works in any
    /// state, so a populator can check its own progress.
    pub fn new_reader(&self) -> IndexReader<'_> {
        IndexReader::new(self.index_id, &self.storage)
    }

    /// Reader for serving lookups.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::IndexNotOnline` while the index is populating
    pub fn online_reader(&self) -> Result<IndexReader<'_>> {
        if !self.is_online() {
            return Err(IndexError::IndexNotOnline(self.index_id));
        }
        Ok(self.new_reader())
    }

    /// Make a closed or dropped mutator usable again.
    ///
    /// The storage handle stays open for as long as the mutator lives, so a
    /// registered instance is revived in place rather than reopening a
    /// directory it still locks. The state is re-read from storage; a dropped
    /// index comes back empty and `Populating`.
    pub fn reopen(&self) -> Result<IndexState> {
        if !self.is_closed() {
            return Ok(self.state());
        }

        let state = match self.storage.get(CF_META, META_STATE_KEY)? {
            Some(bytes) => IndexState::decode(&bytes)?,
            None => IndexState::Populating,
        };
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
        self.closed.store(false, Ordering::Release);
        debug!(index_id = self.index_id, %state, "Reopened index");
        Ok(state)
    }

    fn apply<I>(&self, operation: DbOperation, updates: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Borrow<PropertyUpdate>,
    {
        self.ensure_open()?;

        let span = db_span(operation, self.index_id);
        let _guard = span.enter();

        let mut batch = self.lock_batch();
        let mut layer = IndexBatch::new();
        let mut applied = 0;

        for update in updates {
            // Dropping `layer` on error discards this call's writes only.
            if let Err(e) = self.stage_update(&batch, &mut layer, update.borrow()) {
                warn!(index_id = self.index_id, applied, error = %e, "Aborting update batch");
                return Err(e);
            }
            applied += 1;
        }

        batch.merge(layer);
        let written = self.flush_locked(&mut batch)?;
        record_db_metrics(None, Some(written));
        Ok(applied)
    }

    fn stage_update(
        &self,
        pending: &IndexBatch,
        layer: &mut IndexBatch,
        update: &PropertyUpdate,
    ) -> Result<()> {
        match update.resolve()? {
            UpdateOp::Added { entity, value } => self.stage_add(pending, layer, entity, value),
            UpdateOp::Changed { entity, before, after } => {
                self.stage_remove(pending, layer, entity, before)?;
                self.stage_add(pending, layer, entity, after)
            }
            UpdateOp::Removed { entity, value } => self.stage_remove(pending, layer, entity, value),
        }
    }

    fn stage_add(
        &self,
        pending: &IndexBatch,
        layer: &mut IndexBatch,
        entity: u64,
        value: &IndexValue,
    ) -> Result<()> {
        let key = codec::encode_value(value)?;
        let mut postings = self.read_postings(pending, layer, &key)?;
        if postings.insert(entity) {
            layer.put(key, postings.encode()?);
        }
        Ok(())
    }

    fn stage_remove(
        &self,
        pending: &IndexBatch,
        layer: &mut IndexBatch,
        entity: u64,
        value: &IndexValue,
    ) -> Result<()> {
        let key = codec::encode_value(value)?;
        let mut postings = self.read_postings(pending, layer, &key)?;
        if !postings.remove(entity) {
            return Ok(());
        }
        if postings.is_empty() {
            layer.delete(key);
        } else {
            layer.put(key, postings.encode()?);
        }
        Ok(())
    }

    /// Posting list for `key`: this call's layer, then the pending batch,
    /// then committed storage.
    fn read_postings(
        &self,
        pending: &IndexBatch,
        layer: &IndexBatch,
        key: &[u8],
    ) -> Result<PostingList> {
        match layer.get(key).or_else(|| pending.get(key)) {
            Some(Staged::Put(bytes)) => PostingList::decode(bytes),
            Some(Staged::Delete) => Ok(PostingList::new()),
            None => match self.storage.get(CF_POSTINGS, key)? {
                Some(bytes) => PostingList::decode(&bytes),
                None => Ok(PostingList::new()),
            },
        }
    }

    /// Delete every posting list and set (`Some`) or remove (`None`) the
    /// persisted state in the same write. Pending entries are discarded.
    fn clear_entries(&self, state: Option<IndexState>) -> Result<usize> {
        let span = db_span(DbOperation::Clear, self.index_id);
        let _guard = span.enter();

        let mut batch = self.lock_batch();
        batch.clear();
        for key in self.storage.keys(CF_POSTINGS)? {
            batch.delete(key);
        }

        let postings = self.storage.cf_handle(CF_POSTINGS)?;
        let meta = self.storage.cf_handle(CF_META)?;
        let mut write = batch.to_write_batch(&postings);
        match state {
            Some(state) => write.put_cf(&meta, META_STATE_KEY, [state.as_byte()]),
            None => write.delete_cf(&meta, META_STATE_KEY),
        }
        self.storage.write(write)?;

        let removed = batch.len();
        batch.clear();
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state.unwrap_or_default();
        record_db_metrics(None, Some(removed));
        Ok(removed)
    }

    fn flush_locked(&self, batch: &mut IndexBatch) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let written = batch.len();
        self.storage.write_batch(CF_POSTINGS, batch)?;
        batch.clear();
        debug!(index_id = self.index_id, keys = written, "Flushed index batch");
        Ok(written)
    }

    fn set_state(&self, state: IndexState) -> Result<()> {
        self.storage.put(CF_META, META_STATE_KEY, &[state.as_byte()])?;
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
        Ok(())
    }

    fn lock_batch(&self) -> MutexGuard<'_, IndexBatch> {
        self.batch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(IndexError::IndexClosed(self.index_id));
        }
        Ok(())
    }
}
