//! Core data types for the index.
//!
//! - `IndexValue`: scalar property value an entity is indexed under
//! - `PropertyUpdate`: one entity-property change
//! - `IndexError`: error type for all operations
//! - `Result`: convenient result type alias

pub mod error;
pub mod update;
pub mod value;

pub use error::{IndexError, Result};
pub use update::{PropertyUpdate, UpdateMode, UpdateOp, UpdateRecord};
pub use value::IndexValue;
