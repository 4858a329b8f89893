//! Tracing instrumentation for index operations.
//!
//! **Span naming**: `{db.operation.name} index-{id}`, e.g. `update index-7`.
//!
//! **Attributes**:
//! - `db.system.name`: always `"rocksdb"`
//! - `db.namespace`: index id
//! - `db.operation.name`: update, recover, flush, lookup, clear, open, destroy
//! - `db.response.returned_rows` / `db.response.affected_rows` when known
//!
//! The library only emits spans and events; installing a subscriber is the
//! binary's job (see `rem-index`).

pub mod db;

pub use db::{db_span, record_db_metrics, DbOperation};
