//! The SQL executor capability consumed by sessions and migrations.

use crate::error::Result;
use crate::row::Rows;
use crate::value::Value;

/// An opaque, connection-bound SQL executor.
///
/// Implementations prepare every statement before running it and report a
/// failed prepare as [`WeaveError::Syntax`](crate::WeaveError::Syntax). All
/// calls may block; timeouts and cancellation belong to the implementation.
pub trait Executor {
    /// Runs a statement that returns no rows, returning the affected row count.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Runs a statement and collects its rows.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Rows>;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        (**self).execute(sql, params)
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Rows> {
        (**self).query(sql, params)
    }

    fn begin(&mut self) -> Result<()> {
        (**self).begin()
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<()> {
        (**self).rollback()
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        (**self).execute(sql, params)
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Rows> {
        (**self).query(sql, params)
    }

    fn begin(&mut self) -> Result<()> {
        (**self).begin()
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<()> {
        (**self).rollback()
    }
}
