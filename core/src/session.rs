//! Running queries on an executor, with or without an explicit transaction

use crate::error::{Result, TransactionStage, WeaveError};
use crate::executor::Executor;
use crate::query::{Query, Statement};
use crate::row::Rows;
use crate::value::Value;
use crate::{pgweave_trace_query, pgweave_trace_tx};

/// Applies the scanner policy: no rows is `NotFound` unless the query throws on found,
/// in which case rows are `Found`.
fn scan(statement: &mut Statement<'_>, rows: &mut Rows) -> Result<()> {
    let Some(scanner) = statement.scanner.as_mut() else {
        return Ok(());
    };
    let found = scanner(rows)?;
    match (found, statement.throw_on_found) {
        (true, true) => Err(WeaveError::Found("rows found".to_string())),
        (false, false) => Err(WeaveError::NotFound("no rows found".to_string())),
        _ => Ok(()),
    }
}

/// Runs `statement`, returning the affected row count, or the number of rows
/// handed to the scanner.
fn run_statement<E: Executor + ?Sized>(
    executor: &mut E,
    statement: &mut Statement<'_>,
) -> std::result::Result<u64, RunError> {
    pgweave_trace_query!(statement.sql, statement.params.len());
    if statement.scanner.is_none() {
        return executor
            .execute(&statement.sql, &statement.params)
            .map_err(RunError::Executor);
    }
    let mut rows = executor
        .query(&statement.sql, &statement.params)
        .map_err(RunError::Executor)?;
    let count = rows.remaining() as u64;
    scan(statement, &mut rows).map_err(RunError::Scanner)?;
    Ok(count)
}

/// Where a run failed: executor failures abort a transaction, scanner outcomes do not.
enum RunError {
    Executor(WeaveError),
    Scanner(WeaveError),
}

/// A connection-bound executor used one statement at a time.
#[derive(Debug)]
pub struct Session<E: Executor> {
    executor: E,
}

impl<E: Executor> Session<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn into_inner(self) -> E {
        self.executor
    }

    /// Validates and runs `query` outside any explicit transaction.
    pub fn run(&mut self, query: Query<'_>) -> Result<u64> {
        let mut statement = query.into_statement()?;
        run_statement(&mut self.executor, &mut statement).map_err(|err| match err {
            RunError::Executor(err) | RunError::Scanner(err) => err,
        })
    }

    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        pgweave_trace_query!(sql, params.len());
        self.executor.execute(sql, params)
    }

    pub fn query(&mut self, sql: &str, params: &[Value]) -> Result<Rows> {
        pgweave_trace_query!(sql, params.len());
        self.executor.query(sql, params)
    }

    /// Starts a transaction that lives until it is committed, rolled back or dropped.
    pub fn transaction(&mut self) -> Result<Transaction<'_, E>> {
        Transaction::begin(&mut self.executor)
    }
}

/// One transaction on a borrowed executor. Statements run strictly in call order.
///
/// Any executor failure rolls the transaction back; the rollback's own failure
/// is joined under the original error. Dropping an unfinished transaction
/// rolls it back.
#[derive(Debug)]
pub struct Transaction<'s, E: Executor + ?Sized> {
    executor: &'s mut E,
    finished: bool,
}

impl<'s, E: Executor + ?Sized> Transaction<'s, E> {
    pub fn begin(executor: &'s mut E) -> Result<Self> {
        pgweave_trace_tx!("begin", "transaction");
        executor.begin().map_err(|err| match err {
            err @ WeaveError::FailedTransaction { .. } => err,
            err => WeaveError::transaction(TransactionStage::Start, err.to_string()),
        })?;
        Ok(Self {
            executor,
            finished: false,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(WeaveError::transaction(
                TransactionStage::Statement,
                "transaction is already finished",
            ));
        }
        Ok(())
    }

    fn rollback_inner(&mut self) -> Result<()> {
        self.finished = true;
        pgweave_trace_tx!("rollback", "transaction");
        self.executor.rollback().map_err(|err| match err {
            err @ WeaveError::FailedTransaction { .. } => err,
            err => WeaveError::transaction(TransactionStage::Rollback, err.to_string()),
        })
    }

    /// Rolls back after an executor failure and returns the combined error.
    fn abort(&mut self, err: WeaveError) -> WeaveError {
        let rollback = self.rollback_inner().err();
        err.join(rollback)
    }

    /// Validates and runs `query` inside the transaction.
    ///
    /// Validation and scanner outcomes (`NotFound`, `Found`, scanner errors)
    /// leave the transaction open.
    pub fn run(&mut self, query: Query<'_>) -> Result<u64> {
        self.ensure_open()?;
        let mut statement = query.into_statement()?;
        self.run_prepared(&mut statement)
    }

    /// Runs an already validated statement. The statement is only borrowed,
    /// so it can run again in a later transaction.
    pub fn run_prepared(&mut self, statement: &mut Statement<'_>) -> Result<u64> {
        self.ensure_open()?;
        match run_statement(&mut *self.executor, statement) {
            Ok(count) => Ok(count),
            Err(RunError::Scanner(err)) => Err(err),
            Err(RunError::Executor(err)) => Err(self.abort(err)),
        }
    }

    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.ensure_open()?;
        pgweave_trace_query!(sql, params.len());
        match self.executor.execute(sql, params) {
            Ok(count) => Ok(count),
            Err(err) => Err(self.abort(err)),
        }
    }

    pub fn query(&mut self, sql: &str, params: &[Value]) -> Result<Rows> {
        self.ensure_open()?;
        pgweave_trace_query!(sql, params.len());
        match self.executor.query(sql, params) {
            Ok(rows) => Ok(rows),
            Err(err) => Err(self.abort(err)),
        }
    }

    pub fn commit(mut self) -> Result<()> {
        self.ensure_open()?;
        self.finished = true;
        pgweave_trace_tx!("commit", "transaction");
        self.executor.commit().map_err(|err| match err {
            err @ WeaveError::FailedTransaction { .. } => err,
            err => WeaveError::transaction(TransactionStage::Commit, err.to_string()),
        })
    }

    pub fn rollback(mut self) -> Result<()> {
        self.ensure_open()?;
        self.rollback_inner()
    }
}

impl<E: Executor + ?Sized> Drop for Transaction<'_, E> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(_err) = self.rollback_inner() {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_err, "pgweave.transaction: rollback on drop failed");
        }
    }
}
