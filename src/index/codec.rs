//! Binary encoding of index keys and posting lists.
//!
//! Keys are the bincode form of an `IndexValue`; posting lists are the
//! bincode form of a `Vec<u64>`. Both use fixed-width little-endian integers
//! and reject trailing bytes, so a byte string decodes to exactly one value
//! or fails. The format must stay stable for the lifetime of an index.

use crate::types::{IndexError, IndexValue, Result};
use bincode::Options;
use std::collections::HashSet;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

/// Encode an indexed value into its storage key.
pub fn encode_value(value: &IndexValue) -> Result<Vec<u8>> {
    options()
        .serialize(value)
        .map_err(|e| IndexError::InternalError(format!("Cannot encode {}: {}", value.type_name(), e)))
}

/// Decode a storage key back into its value.
///
/// # Errors
///
/// Returns `IndexError::CorruptEncoding` on truncated input, trailing bytes,
/// an unknown variant tag or invalid UTF-8
pub fn decode_value(bytes: &[u8]) -> Result<IndexValue> {
    options()
        .deserialize(bytes)
        .map_err(|e| IndexError::corrupt(format!("index value: {}", e)))
}

/// Encode a posting list, preserving order.
pub fn encode_ids(ids: &[u64]) -> Result<Vec<u8>> {
    options()
        .serialize(ids)
        .map_err(|e| IndexError::InternalError(format!("Cannot encode posting list: {}", e)))
}

/// Decode a stored posting list.
///
/// # Errors
///
/// Returns `IndexError::CorruptEncoding` if the bytes do not decode, or if
/// the list is empty or holds duplicates (neither is ever written)
pub fn decode_ids(bytes: &[u8]) -> Result<Vec<u64>> {
    let ids: Vec<u64> = options()
        .deserialize(bytes)
        .map_err(|e| IndexError::corrupt(format!("posting list: {}", e)))?;

    if ids.is_empty() {
        return Err(IndexError::corrupt("posting list is present but empty"));
    }

    let mut seen = HashSet::with_capacity(ids.len());
    if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
        return Err(IndexError::corrupt(format!("posting list repeats entity {}", dup)));
    }

    Ok(ids)
}
