//! Logging hooks for statements and transactions.
//!
//! pgweave logs under three message prefixes:
//!
//! | message               | level | emitted by                                   |
//! |-----------------------|-------|----------------------------------------------|
//! | `pgweave.query`       | debug | every statement a session or executor runs   |
//! | `pgweave.transaction` | info  | `BEGIN`, `COMMIT` and `ROLLBACK`             |
//! | `pgweave.migrate: ..` | info  | tables, types and users created or dropped   |
//!
//! The macros below expand to nothing unless the calling crate enables its
//! `tracing` feature. Migration events are written with `tracing` directly.

/// Logs a statement about to run, with its placeholder count.
///
/// ```ignore
/// pgweave_trace_query!(statement.sql, statement.params.len());
/// ```
#[macro_export]
macro_rules! pgweave_trace_query {
    ($sql:expr, $params:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %$sql, params = $params, "pgweave.query");
    };
}

/// Logs a transaction boundary. `source` names who issued it: a
/// [`Transaction`](crate::Transaction) or an executor.
///
/// ```ignore
/// pgweave_trace_tx!("commit", "postgres");
/// ```
#[macro_export]
macro_rules! pgweave_trace_tx {
    ($event:literal, $source:literal) => {
        #[cfg(feature = "tracing")]
        tracing::info!(event = $event, source = $source, "pgweave.transaction");
    };
}
