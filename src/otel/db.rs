//! Database operation instrumentation.
//!
//! Span fields follow the OpenTelemetry database conventions so a
//! subscriber exporting to OTLP picks them up unchanged.

use tracing::{field, span, Level, Span};

/// Index operation types (maps to `db.operation.name`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbOperation {
    /// Apply a stream of property updates
    Update,
    /// Replay updates after a crash
    Recover,
    /// Write the pending batch
    Flush,
    /// Exact-value lookup through a reader
    Lookup,
    /// Delete every entry (create or drop)
    Clear,
    /// Open an index directory
    Open,
    /// Remove an index directory
    Destroy,
}

impl DbOperation {
    /// Get operation name as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Recover => "recover",
            Self::Flush => "flush",
            Self::Lookup => "lookup",
            Self::Clear => "clear",
            Self::Open => "open",
            Self::Destroy => "destroy",
        }
    }
}

/// Create index operation span with semantic conventions.
///
/// # Arguments
///
/// * `operation` - Operation type
/// * `index_id` - Index the operation targets (`db.namespace`)
///
/// # Returns
///
/// Tracing span; `db.response.*` fields start empty and are filled by
/// `record_db_metrics`
///
/// # Example
///
/// ```rust,ignore
/// let span = db_span(DbOperation::Update, 7);
/// let _guard = span.enter();
/// ```
pub fn db_span(operation: DbOperation, index_id: u64) -> Span {
    span!(
        Level::INFO,
        "db",
        otel.name = %format!("{} index-{}", operation.as_str(), index_id),
        otel.kind = "client",
        db.system.name = "rocksdb",
        db.operation.name = operation.as_str(),
        db.namespace = index_id,
        db.response.returned_rows = field::Empty,
        db.response.affected_rows = field::Empty,
    )
}

/// Record operation metrics in the current span.
///
/// # Arguments
///
/// * `rows_returned` - Number of ids returned (lookups)
/// * `rows_affected` - Number of keys written or deleted
pub fn record_db_metrics(rows_returned: Option<usize>, rows_affected: Option<usize>) {
    let span = Span::current();
    if let Some(returned) = rows_returned {
        span.record("db.response.returned_rows", returned);
    }
    if let Some(affected) = rows_affected {
        span.record("db.response.affected_rows", affected);
    }
}
