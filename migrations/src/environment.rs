//! Login roles and databases
//!
//! These statements run outside any transaction because Postgres refuses
//! `CREATE DATABASE` inside one. A failed user migration with `undo_on_error`
//! drops every user it created, together with the databases they own.

use crate::config::IdempotencyPolicy;
use crate::ddl;
use crate::migrator::{MigrationReport, Migrator};
use pgweave_core::schema::is_identifier;
use pgweave_core::{Executor, Result, Value, WeaveError};

/// A login role to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    name: String,
    password: String,
}

impl User {
    /// The name is lower-cased with spaces replaced by underscores.
    pub fn new(name: &str, password: impl Into<String>) -> Self {
        Self {
            name: ddl::role_name(name),
            password: password.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

/// A database and the user owning it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Database {
    name: String,
    owner: String,
}

impl Database {
    pub fn new(name: &str, owner: &User) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            owner: owner.name.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }
}

fn check_identifier(kind: &str, name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(WeaveError::Syntax(format!("{name:?} is not a valid {kind} name")))
    }
}

fn exists<E: Executor>(executor: &mut E, probe: &str, name: &str) -> Result<bool> {
    let rows = executor.query(probe, &[Value::from(name)])?;
    Ok(!rows.is_empty())
}

fn execute<E: Executor>(executor: &mut E, sql: &str) -> Result<()> {
    pgweave_core::pgweave_trace_query!(sql, 0);
    executor.execute(sql, &[]).map(|_| ())
}

/// Drops the databases owned by `user`, then the user.
fn drop_user<E: Executor>(executor: &mut E, user: &str, report: &mut MigrationReport) -> Result<()> {
    let mut owned = executor.query(ddl::DATABASES_OWNED_BY, &[Value::from(user)])?;
    let mut databases = Vec::with_capacity(owned.remaining());
    while let Some(row) = owned.next_row() {
        databases.push(row.get::<String>(0)?);
    }
    for database in databases {
        execute(executor, &ddl::drop_database(&database))
            .map_err(|err| err.context(format!("unable to drop database {database}")))?;
        report.dropped.push(database);
    }
    execute(executor, &ddl::drop_user(user))
        .map_err(|err| err.context(format!("unable to drop user {user}")))?;
    #[cfg(feature = "tracing")]
    tracing::info!(user, "pgweave.migrate: dropped user");
    report.dropped.push(user.to_string());
    Ok(())
}

impl Migrator<'_> {
    /// Creates `users` in order. On failure with `undo_on_error`, the users created
    /// by this call are dropped again and any failure doing so is joined.
    pub fn migrate_users<E: Executor>(
        &self,
        executor: &mut E,
        users: &[User],
    ) -> Result<MigrationReport> {
        let config = self.config();
        config.ensure_enabled()?;

        let mut report = MigrationReport::default();
        let mut created: Vec<&str> = Vec::new();
        for user in users {
            if let Err(err) = self.migrate_user(executor, user, &mut report, &mut created) {
                let err = err.context(format!("unable to migrate user {}", user.name()));
                if !config.undo_on_error {
                    return Err(err);
                }
                let mut undo = MigrationReport::default();
                let undo_err = created
                    .iter()
                    .rev()
                    .try_for_each(|name| drop_user(executor, name, &mut undo))
                    .err();
                if let Some(_failed) = &undo_err {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %_failed, "pgweave.migrate: undo of created users failed");
                }
                return Err(err.join(undo_err));
            }
        }
        Ok(report)
    }

    fn migrate_user<'u, E: Executor>(
        &self,
        executor: &mut E,
        user: &'u User,
        report: &mut MigrationReport,
        created: &mut Vec<&'u str>,
    ) -> Result<()> {
        check_identifier("user", user.name())?;
        if exists(executor, ddl::ROLE_EXISTS, user.name())? {
            match self.config().policy {
                IdempotencyPolicy::Ignore => {
                    #[cfg(feature = "tracing")]
                    tracing::info!(user = user.name(), "pgweave.migrate: user exists, skipped");
                    report.skipped.push(user.name().to_string());
                    return Ok(());
                }
                IdempotencyPolicy::Recreate => drop_user(executor, user.name(), report)?,
                IdempotencyPolicy::Fail => {}
            }
        }

        execute(executor, &ddl::create_user(user.name(), user.password()))?;
        #[cfg(feature = "tracing")]
        tracing::info!(user = user.name(), "pgweave.migrate: created user");
        created.push(user.name());
        report.created.push(user.name().to_string());
        Ok(())
    }

    /// Creates `database` owned by its user, applying the idempotency policy.
    pub fn migrate_database<E: Executor>(
        &self,
        executor: &mut E,
        database: &Database,
    ) -> Result<MigrationReport> {
        self.config().ensure_enabled()?;
        check_identifier("database", database.name())?;
        check_identifier("user", database.owner())?;

        let mut report = MigrationReport::default();
        let name = database.name();
        if exists(executor, ddl::DATABASE_EXISTS, name)? {
            match self.config().policy {
                IdempotencyPolicy::Ignore => {
                    report.skipped.push(name.to_string());
                    return Ok(report);
                }
                IdempotencyPolicy::Recreate => {
                    execute(executor, &ddl::drop_database(name))
                        .map_err(|err| err.context(format!("unable to drop database {name}")))?;
                    report.dropped.push(name.to_string());
                }
                IdempotencyPolicy::Fail => {}
            }
        }

        execute(executor, &ddl::create_database(name, database.owner()))
            .map_err(|err| err.context(format!("unable to create database {name}")))?;
        #[cfg(feature = "tracing")]
        tracing::info!(database = name, owner = database.owner(), "pgweave.migrate: created database");
        report.created.push(name.to_string());
        Ok(report)
    }
}
