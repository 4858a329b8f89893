//! Storage naming for index directories and metadata keys.
//!
//! Each index lives in its own RocksDB directory named deterministically
//! from its id; nothing is shared between indexes.

use std::path::{Path, PathBuf};

/// Prefix of every index directory name.
const INDEX_DIR_PREFIX: &str = "index-";

/// Metadata key holding the persisted lifecycle state.
pub const META_STATE_KEY: &[u8] = b"state";

/// Directory name for an index.
///
/// Format: `index-{index_id}`
pub fn index_dir_name(index_id: u64) -> String {
    format!("{}{}", INDEX_DIR_PREFIX, index_id)
}

/// Full directory path for an index under `root`.
pub fn index_path(root: &Path, index_id: u64) -> PathBuf {
    root.join(index_dir_name(index_id))
}

/// Parse an index id back out of a directory name.
///
/// # Returns
///
/// `Some(index_id)` for names produced by `index_dir_name`, `None` otherwise
pub fn parse_index_dir_name(name: &str) -> Option<u64> {
    name.strip_prefix(INDEX_DIR_PREFIX)?.parse().ok()
}
