//! Posting lists: the entity ids indexed under one value.
//!
//! Lists are kept in insertion order and scanned linearly; they are
//! expected to be small next to the total number of entities.

use super::codec;
use crate::types::Result;

/// Duplicate-free, insertion-ordered set of entity ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    ids: Vec<u64>,
}

impl PostingList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a stored list.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::CorruptEncoding` if the bytes are not a valid,
    /// non-empty, duplicate-free list
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            ids: codec::decode_ids(bytes)?,
        })
    }

    /// Encode for storage. Callers never store an empty list.
    pub fn encode(&self) -> Result<Vec<u8>> {
        codec::encode_ids(&self.ids)
    }

    /// Add `id` at the end unless already present.
    ///
    /// # Returns
    ///
    /// `true` if the list changed
    pub fn insert(&mut self, id: u64) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Remove `id`, keeping the order of the remaining ids.
    ///
    /// # Returns
    ///
    /// `true` if the list changed
    pub fn remove(&mut self, id: u64) -> bool {
        match self.ids.iter().position(|&existing| existing == id) {
            Some(idx) => {
                self.ids.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.ids
    }

    pub fn into_vec(self) -> Vec<u64> {
        self.ids
    }
}
