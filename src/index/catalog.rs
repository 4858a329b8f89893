//! Registry of open index mutators.

use super::mutator::IndexMutator;
use crate::types::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Open mutators keyed by index id.
///
/// Shared between populator and accessor lookups so both see the same
/// instance for an id.
#[derive(Default)]
pub struct IndexCatalog {
    mutators: DashMap<u64, Arc<IndexMutator>>,
}

impl IndexCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered mutator for `index_id`, opening it with `open` if absent.
    ///
    /// `open` runs while the entry is locked, so concurrent callers for the
    /// same id all receive the first instance and `open` runs at most once.
    /// A failing `open` registers nothing.
    pub fn get_or_create<F>(&self, index_id: u64, open: F) -> Result<Arc<IndexMutator>>
    where
        F: FnOnce() -> Result<IndexMutator>,
    {
        if let Some(existing) = self.mutators.get(&index_id) {
            return Ok(Arc::clone(existing.value()));
        }

        match self.mutators.entry(index_id) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let mutator = Arc::new(open()?);
                entry.insert(Arc::clone(&mutator));
                Ok(mutator)
            }
        }
    }

    pub fn get(&self, index_id: u64) -> Option<Arc<IndexMutator>> {
        self.mutators.get(&index_id).map(|m| Arc::clone(m.value()))
    }

    /// Unregister and return the mutator for `index_id`.
    pub fn remove(&self, index_id: u64) -> Option<Arc<IndexMutator>> {
        self.mutators.remove(&index_id).map(|(_, m)| m)
    }

    /// Unregister `index_id` if the catalog holds the only reference.
    ///
    /// # Returns
    ///
    /// `true` if nothing is registered for the id afterwards; `false` if the
    /// mutator is still shared and stays registered
    pub fn release(&self, index_id: u64) -> bool {
        self.mutators
            .remove_if(&index_id, |_, m| Arc::strong_count(m) == 1);
        !self.mutators.contains_key(&index_id)
    }

    pub fn contains(&self, index_id: u64) -> bool {
        self.mutators.contains_key(&index_id)
    }

    pub fn len(&self) -> usize {
        self.mutators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutators.is_empty()
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.mutators.iter().map(|m| *m.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Unregister every mutator, returned in id order.
    pub fn drain(&self) -> Vec<Arc<IndexMutator>> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.remove(id))
            .collect()
    }
}
