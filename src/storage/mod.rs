//! RocksDB storage layer.

mod batch;
pub mod column_families;
mod db;
pub mod keys;

pub use batch::{IndexBatch, Staged};
pub use column_families::{CF_META, CF_POSTINGS};
pub use db::Storage;
