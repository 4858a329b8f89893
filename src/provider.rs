//! Host-facing index provider.
//!
//! Maps index ids to directories under one root, hands out populators and
//! online accessors, and owns the lifecycle of the underlying storage.

use crate::config::ProviderConfig;
use crate::index::{IndexCatalog, IndexMutator, IndexState};
use crate::otel::{db_span, DbOperation};
use crate::storage::keys::{index_path, parse_index_dir_name};
use crate::storage::Storage;
use crate::types::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Key under which the provider registers with a host.
pub const PROVIDER_KEY: &str = "rocksdb-index";

/// Provider implementation version.
pub const PROVIDER_VERSION: &str = "1.0";

/// Provider identity as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub name: String,
    pub version: String,
}

impl Default for ProviderDescriptor {
    fn default() -> Self {
        Self {
            name: PROVIDER_KEY.to_string(),
            version: PROVIDER_VERSION.to_string(),
        }
    }
}

/// Index provider over one root directory.
///
/// # Example
///
/// ```rust,ignore
/// let provider = IndexProvider::new(ProviderConfig::from_env()?)?;
/// let populator = provider.get_populator(7)?;
/// populator.apply_updates([PropertyUpdate::added(1, "x")])?;
/// populator.complete_population(true)?;
///
/// let accessor = provider.get_online_accessor(7)?;
/// let ids = accessor.online_reader()?.lookup(&"x".into())?;
/// ```
pub struct IndexProvider {
    config: ProviderConfig,
    catalog: IndexCatalog,
}

impl IndexProvider {
    /// Create a provider, creating the root directory if needed.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        config.ensure_root_dir()?;
        info!(root = %config.root_dir.display(), "Index provider ready");
        Ok(Self {
            config,
            catalog: IndexCatalog::new(),
        })
    }

    pub fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor::default()
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Mutator used to populate `index_id`, opened on first use.
    ///
    /// A registered instance that was closed or dropped while still held
    /// elsewhere is revived in place.
    pub fn get_populator(&self, index_id: u64) -> Result<Arc<IndexMutator>> {
        let mutator = self.catalog.get_or_create(index_id, || self.open(index_id))?;
        mutator.reopen()?;
        Ok(mutator)
    }

    /// Mutator for an index that finished population.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::IndexNotOnline` if the index is unknown or still
    /// populating
    pub fn get_online_accessor(&self, index_id: u64) -> Result<Arc<IndexMutator>> {
        let mutator = match self.catalog.get(index_id) {
            Some(mutator) => {
                mutator.reopen()?;
                mutator
            }
            None => self
                .existing(index_id)?
                .ok_or(IndexError::IndexNotOnline(index_id))?,
        };

        if !mutator.is_online() {
            return Err(IndexError::IndexNotOnline(index_id));
        }
        Ok(mutator)
    }

    /// State the host should assume for `index_id` at startup.
    ///
    /// An index with no directory yet reports `Populating`.
    pub fn get_initial_state(&self, index_id: u64) -> Result<IndexState> {
        if let Some(mutator) = self.catalog.get(index_id) {
            return Ok(mutator.state());
        }
        Ok(self
            .existing(index_id)?
            .map(|mutator| mutator.state())
            .unwrap_or_default())
    }

    /// Remove every entry of `index_id` and release its directory.
    ///
    /// Entries are always cleared, even on a closed mutator. The directory is
    /// destroyed only once no caller still holds the mutator; otherwise the
    /// emptied instance stays registered so the id is never reopened over a
    /// directory it still locks, and the next `get_populator` revives it.
    pub fn drop_index(&self, index_id: u64) -> Result<()> {
        let span = db_span(DbOperation::Destroy, index_id);
        let _guard = span.enter();

        if let Some(mutator) = self.catalog.get(index_id) {
            mutator.drop_index()?;
        }

        if !self.catalog.release(index_id) {
            warn!(index_id, "Index still held elsewhere, directory kept");
            return Ok(());
        }

        let path = index_path(&self.config.root_dir, index_id);
        if path.exists() {
            Storage::destroy(&path, &self.config.storage)?;
            if path.exists() {
                fs::remove_dir_all(&path)?;
            }
        }
        info!(index_id, "Index directory released");
        Ok(())
    }

    /// Ids of every index directory under the root, sorted.
    pub fn list_indexes(&self) -> Result<Vec<u64>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.config.root_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(parse_index_dir_name) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Close every open index.
    ///
    /// Every mutator is attempted; the first failure is returned. Mutators
    /// still held by callers stay registered (closed) and are revived by
    /// `get_populator`.
    pub fn shutdown(&self) -> Result<()> {
        let mut first_error = None;

        for index_id in self.catalog.ids() {
            if let Some(mutator) = self.catalog.get(index_id) {
                if !mutator.is_closed() {
                    if let Err(e) = mutator.close() {
                        warn!(index_id, error = %e, "Failed to close index");
                        first_error.get_or_insert(e);
                    }
                }
            }
            if !self.catalog.release(index_id) {
                debug!(index_id, "Closed index still held elsewhere");
            }
        }

        info!("Index provider shut down");
        first_error.map_or(Ok(()), Err)
    }

    fn open(&self, index_id: u64) -> Result<IndexMutator> {
        IndexMutator::open(
            index_id,
            index_path(&self.config.root_dir, index_id),
            &self.config.storage,
        )
    }

    /// Registered or on-disk mutator; `None` if the index has no directory.
    fn existing(&self, index_id: u64) -> Result<Option<Arc<IndexMutator>>> {
        if !index_path(&self.config.root_dir, index_id).exists() {
            debug!(index_id, "No directory for index");
            return Ok(None);
        }
        self.get_populator(index_id).map(Some)
    }
}
