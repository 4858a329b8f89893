//! Percolate Index - RocksDB-backed exact-value secondary index.
//!
//! Maps property values to posting lists of entity ids, one RocksDB
//! directory per index. Writers apply streams of property updates in atomic
//! batches; readers look values up against point-in-time snapshots.

pub mod config;
pub mod index;
pub mod otel;
pub mod provider;
pub mod storage;
pub mod types;

// Re-export main types
pub use config::{ProviderConfig, StorageOptions};
pub use index::{IndexCatalog, IndexMutator, IndexReader, IndexState};
pub use provider::{IndexProvider, ProviderDescriptor};
pub use types::{IndexError, IndexValue, PropertyUpdate, Result, UpdateMode, UpdateRecord};
