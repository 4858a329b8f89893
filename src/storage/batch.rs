//! Write batch operations.

use rocksdb::{AsColumnFamilyRef, WriteBatch};
use std::collections::BTreeMap;

/// Pending operation for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staged {
    Put(Vec<u8>),
    Delete,
}

/// Staged key writes for one index, not yet durable.
///
/// Unlike a bare `WriteBatch` the staged operations stay readable, so a
/// read-modify-write later in the same update call sees earlier writes.
/// Repeated writes to one key collapse to the last one.
#[derive(Debug, Default)]
pub struct IndexBatch {
    staged: BTreeMap<Vec<u8>, Staged>,
}

impl IndexBatch {
    /// Create new batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add put operation.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.staged.insert(key, Staged::Put(value));
    }

    /// Add delete operation.
    pub fn delete(&mut self, key: Vec<u8>) {
        self.staged.insert(key, Staged::Delete);
    }

    /// Staged operation for `key`, if any.
    pub fn get(&self, key: &[u8]) -> Option<&Staged> {
        self.staged.get(key)
    }

    /// Number of staged keys.
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Move every operation of `other` into this batch, `other` winning on
    /// shared keys.
    pub fn merge(&mut self, other: IndexBatch) {
        self.staged.extend(other.staged);
    }

    /// Drop every staged operation.
    pub fn clear(&mut self) {
        self.staged.clear();
    }

    /// Build a RocksDB batch targeting `cf`.
    pub fn to_write_batch(&self, cf: &impl AsColumnFamilyRef) -> WriteBatch {
        let mut batch = WriteBatch::default();
        for (key, op) in &self.staged {
            match op {
                Staged::Put(value) => batch.put_cf(cf, key, value),
                Staged::Delete => batch.delete_cf(cf, key),
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut batch = IndexBatch::new();
        batch.put(b"k".to_vec(), b"v1".to_vec());
        batch.put(b"k".to_vec(), b"v2".to_vec());
        assert_eq!(batch.get(b"k"), Some(&Staged::Put(b"v2".to_vec())));

        batch.delete(b"k".to_vec());
        assert_eq!(batch.get(b"k"), Some(&Staged::Delete));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_merge_overrides() {
        let mut base = IndexBatch::new();
        base.put(b"a".to_vec(), b"1".to_vec());
        base.put(b"b".to_vec(), b"1".to_vec());

        let mut layer = IndexBatch::new();
        layer.delete(b"a".to_vec());
        layer.put(b"c".to_vec(), b"3".to_vec());

        base.merge(layer);
        assert_eq!(base.get(b"a"), Some(&Staged::Delete));
        assert_eq!(base.get(b"b"), Some(&Staged::Put(b"1".to_vec())));
        assert_eq!(base.len(), 3);
    }

    #[test]
    fn test_clear() {
        let mut batch = IndexBatch::new();
        batch.put(b"a".to_vec(), b"1".to_vec());
        batch.delete(b"b".to_vec());
        assert_eq!(batch.len(), 2);

        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.get(b"a"), None);
    }
}
