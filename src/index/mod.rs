//! Exact-value secondary index.
//!
//! Each distinct property value maps to a posting list of entity ids:
//!
//! ```text
//! postings CF:  encode_value(value) -> encode_ids([id, ...])
//! meta CF:      "state"             -> 0 (populating) | 1 (online)
//! ```

pub mod catalog;
pub mod codec;
pub mod mutator;
pub mod posting;
pub mod reader;
pub mod state;

pub use catalog::IndexCatalog;
pub use mutator::IndexMutator;
pub use posting::PostingList;
pub use reader::IndexReader;
pub use state::IndexState;
