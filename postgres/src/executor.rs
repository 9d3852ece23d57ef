//! [`Executor`] over a synchronous `postgres::Client`

use crate::values::{PgParam, row_values};
use pgweave_core::{
    Executor, Result, Rows, TransactionStage, Value, WeaveError, pgweave_trace_query,
    pgweave_trace_tx,
};
use postgres::config::SslMode;
use postgres::types::ToSql;
use postgres::{Client, Config, NoTls, Statement};

const DEFAULT_PORT: u16 = 5432;

/// Runs pgweave statements on one connection.
///
/// Every statement is prepared before it runs. A failed prepare is reported as
/// [`WeaveError::Syntax`], a failed execution as [`WeaveError::FailedOperation`].
pub struct PostgresExecutor {
    client: Client,
}

impl PostgresExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&mut self) -> &mut Client {
        &mut self.client
    }

    pub fn into_inner(self) -> Client {
        self.client
    }

    fn prepare(&mut self, sql: &str) -> Result<Statement> {
        self.client
            .prepare(sql)
            .map_err(|e| WeaveError::Syntax(format!("unable to prepare statement: {e}")))
    }

    fn control(&mut self, sql: &str, stage: TransactionStage) -> Result<()> {
        self.client
            .batch_execute(sql)
            .map_err(|e| WeaveError::transaction(stage, e.to_string()))
    }
}

fn bind(params: &[Value]) -> Vec<PgParam<'_>> {
    params.iter().map(PgParam).collect()
}

fn refs<'a>(bound: &'a [PgParam<'a>]) -> Vec<&'a (dyn ToSql + Sync)> {
    bound.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

impl Executor for PostgresExecutor {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        pgweave_trace_query!(sql, params.len());
        let statement = self.prepare(sql)?;
        let bound = bind(params);
        self.client
            .execute(&statement, &refs(&bound))
            .map_err(|e| WeaveError::FailedOperation(e.to_string()))
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Rows> {
        pgweave_trace_query!(sql, params.len());
        let statement = self.prepare(sql)?;
        let bound = bind(params);
        let rows = self
            .client
            .query(&statement, &refs(&bound))
            .map_err(|e| WeaveError::FailedOperation(e.to_string()))?;

        let columns = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let mut result = Rows::new(columns);
        for row in &rows {
            result.push(row_values(row)?);
        }
        Ok(result)
    }

    fn begin(&mut self) -> Result<()> {
        pgweave_trace_tx!("begin", "postgres");
        self.control("BEGIN", TransactionStage::Start)
    }

    fn commit(&mut self) -> Result<()> {
        pgweave_trace_tx!("commit", "postgres");
        self.control("COMMIT", TransactionStage::Commit)
    }

    fn rollback(&mut self) -> Result<()> {
        pgweave_trace_tx!("rollback", "postgres");
        self.control("ROLLBACK", TransactionStage::Rollback)
    }
}

/// Splits `host[:port]`.
fn host_and_port(host: &str) -> Result<(&str, u16)> {
    match host.rsplit_once(':') {
        Some((name, port)) => port
            .parse()
            .map(|port| (name, port))
            .map_err(|_| WeaveError::BadConnection(format!("invalid port in host {host:?}"))),
        None => Ok((host, DEFAULT_PORT)),
    }
}

/// Connection settings for `host[:port]`, without TLS.
pub fn config(host: &str, database: &str, user: &str, password: &str) -> Result<Config> {
    let (name, port) = host_and_port(host)?;
    let mut config = Config::new();
    config
        .host(name)
        .port(port)
        .dbname(database)
        .user(user)
        .password(password)
        .ssl_mode(SslMode::Disable);
    Ok(config)
}

/// Opens a connection and pings it.
pub fn connect(host: &str, database: &str, user: &str, password: &str) -> Result<PostgresExecutor> {
    let mut client = config(host, database, user, password)?
        .connect(NoTls)
        .map_err(|e| {
            WeaveError::BadConnection(format!("unable to connect to {database} on {host}: {e}"))
        })?;
    client
        .simple_query("SELECT 1")
        .map_err(|e| WeaveError::BadConnection(format!("unable to ping {database} on {host}: {e}")))?;

    #[cfg(feature = "tracing")]
    tracing::info!(host, database, user, "pgweave.connect: connected");
    Ok(PostgresExecutor::new(client))
}
