//! Column family constants and setup for RocksDB.
//!
//! Every index directory holds two column families: posting lists keyed by
//! encoded value, and a small metadata family for lifecycle state.

use crate::config::StorageOptions;
use rocksdb::{ColumnFamilyDescriptor, Options};

/// Posting lists: encoded value -> encoded entity ids
pub const CF_POSTINGS: &str = "postings";

/// Index metadata (lifecycle state)
pub const CF_META: &str = "meta";

/// Get all column family names.
pub fn all_column_families() -> Vec<&'static str> {
    vec![CF_POSTINGS, CF_META]
}

/// Create column family descriptors.
///
/// # Arguments
///
/// * `options` - Storage options (compression applies to postings only)
///
/// # Returns
///
/// Vector of `ColumnFamilyDescriptor` for every family in `all_column_families`
pub fn create_column_family_descriptors(options: &StorageOptions) -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_POSTINGS, postings_cf_options(options)),
        ColumnFamilyDescriptor::new(CF_META, Options::default()),
    ]
}

/// Get options for the postings CF.
pub fn postings_cf_options(options: &StorageOptions) -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(options.compression.into());
    opts
}
