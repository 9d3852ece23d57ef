//! Dependency-ordered migration of registered tables and types
//!
//! A run validates the whole registry, then walks the tables in registration
//! order inside a single transaction. Each table first creates the types and
//! tables it requires (depth first), then itself. Objects are created at most
//! once per run and a failure anywhere rolls the whole run back.

use crate::config::{IdempotencyPolicy, MigrationConfig};
use crate::ddl;
use hashbrown::HashSet;
use pgweave_core::{
    Executor, Named, Query, Result, SchemaRegistry, Statement, TableId, Transaction, TypeId,
    Value, WeaveError,
};

/// Objects touched by one migration call, in the order they were handled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub created: Vec<String>,
    pub dropped: Vec<String>,
    pub skipped: Vec<String>,
    /// Populator statements run after the relations
    pub populated: usize,
}

/// Runs migrations for the tables and types of one [`SchemaRegistry`].
pub struct Migrator<'r> {
    registry: &'r SchemaRegistry,
    config: MigrationConfig,
    populators: Vec<Result<Statement<'r>>>,
}

impl<'r> Migrator<'r> {
    pub fn new(registry: &'r SchemaRegistry, config: MigrationConfig) -> Self {
        Self {
            registry,
            config,
            populators: Vec::new(),
        }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn registry(&self) -> &'r SchemaRegistry {
        self.registry
    }

    /// Queues a statement to run after the relations, in the same transaction
    /// and in the order it was added. The queue is cleared once a run commits.
    ///
    /// An invalid query fails the next run before any DDL is issued.
    pub fn populate(&mut self, query: Query<'r>) -> &mut Self {
        self.populators.push(query.into_statement());
        self
    }

    pub fn pending_populators(&self) -> usize {
        self.populators.len()
    }

    /// Creates every registered table and required type, then runs the populators.
    pub fn migrate_relations<E: Executor>(&mut self, executor: &mut E) -> Result<MigrationReport> {
        self.config.ensure_enabled()?;
        self.validate()?;

        let registry = self.registry;
        let populators = &mut self.populators;
        let mut walk = RelationWalk::new(registry, self.config.policy);
        in_transaction(executor, |tx| {
            for (id, table) in registry.tables() {
                walk.table(tx, id)
                    .map_err(|err| err.context(format!("unable to migrate table {}", table.name())))?;
            }
            for statement in populators.iter_mut().flatten() {
                tx.run_prepared(statement)
                    .map_err(|err| err.context("unable to run migration populator"))?;
                walk.report.populated += 1;
            }
            Ok(())
        })?;
        self.populators.clear();

        #[cfg(feature = "tracing")]
        tracing::info!(
            created = walk.report.created.len(),
            dropped = walk.report.dropped.len(),
            skipped = walk.report.skipped.len(),
            populated = walk.report.populated,
            "pgweave.migrate: relations migrated"
        );
        Ok(walk.report)
    }

    /// Drops every registered table that exists, dependents first.
    pub fn drop_relations<E: Executor>(&self, executor: &mut E) -> Result<MigrationReport> {
        self.config.ensure_enabled()?;

        let mut report = MigrationReport::default();
        let tables: Vec<_> = self.registry.tables().collect();
        in_transaction(executor, |tx| {
            for (_, table) in tables.iter().rev() {
                if !exists(tx, ddl::TABLE_EXISTS, table.name())? {
                    report.skipped.push(table.name().to_string());
                    continue;
                }
                tx.execute(&ddl::drop_table(table.name()), &[])
                    .map_err(|err| err.context(format!("unable to drop table {}", table.name())))?;
                #[cfg(feature = "tracing")]
                tracing::info!(table = table.name(), "pgweave.migrate: dropped table");
                report.dropped.push(table.name().to_string());
            }
            Ok(())
        })?;
        Ok(report)
    }

    /// Checks every table and every type it requires before any DDL is issued.
    fn validate(&self) -> Result<()> {
        self.registry.validate()?;
        if let Some(Err(err)) = self.populators.iter().find(|populator| populator.is_err()) {
            return Err(err.clone().context("unable to run migration populator"));
        }
        for (_, table) in self.registry.tables() {
            for id in table.required_types() {
                let ty = self
                    .registry
                    .type_descriptor(id)
                    .map_err(|err| err.context(format!("table {}", table.name())))?;
                if let Some(err) = ty.registration_error() {
                    return Err(err
                        .clone()
                        .context(format!("type {} required by table {}", ty.name(), table.name())));
                }
            }
        }
        Ok(())
    }
}

/// Runs `body` in a transaction: commit on success, otherwise roll back and
/// join the rollback's failure under the original error.
pub(crate) fn in_transaction<E, T>(
    executor: &mut E,
    body: impl FnOnce(&mut Transaction<'_, E>) -> Result<T>,
) -> Result<T>
where
    E: Executor,
{
    let mut tx = Transaction::begin(executor)?;
    match body(&mut tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) if tx.is_finished() => Err(err),
        Err(err) => {
            let rollback = tx.rollback().err();
            if let Some(_failed) = &rollback {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_failed, "pgweave.migrate: rollback failed");
            }
            Err(err.join(rollback))
        }
    }
}

fn exists<E: Executor>(tx: &mut Transaction<'_, E>, probe: &str, name: &str) -> Result<bool> {
    let rows = tx.query(probe, &[Value::from(name)])?;
    Ok(!rows.is_empty())
}

/// Per-run state: what was already handled and what is being created right now.
struct RelationWalk<'r> {
    registry: &'r SchemaRegistry,
    policy: IdempotencyPolicy,
    done_tables: HashSet<TableId>,
    done_types: HashSet<TypeId>,
    visiting: Vec<TableId>,
    report: MigrationReport,
}

impl<'r> RelationWalk<'r> {
    fn new(registry: &'r SchemaRegistry, policy: IdempotencyPolicy) -> Self {
        Self {
            registry,
            policy,
            done_tables: HashSet::new(),
            done_types: HashSet::new(),
            visiting: Vec::new(),
            report: MigrationReport::default(),
        }
    }

    fn cycle_error(&self, id: TableId) -> WeaveError {
        let start = self.visiting.iter().position(|v| *v == id).unwrap_or(0);
        let path: Vec<&str> = self.visiting[start..]
            .iter()
            .chain(std::iter::once(&id))
            .filter_map(|v| self.registry.table(*v).ok())
            .map(|t| t.name())
            .collect();
        WeaveError::DependencyCycle(path.join(" -> "))
    }

    fn table<E: Executor>(&mut self, tx: &mut Transaction<'_, E>, id: TableId) -> Result<()> {
        if self.done_tables.contains(&id) {
            return Ok(());
        }
        if self.visiting.contains(&id) {
            return Err(self.cycle_error(id));
        }
        let registry = self.registry;
        let table = registry.table(id)?;
        let name = table.name();

        if exists(tx, ddl::TABLE_EXISTS, name)? {
            match self.policy {
                IdempotencyPolicy::Ignore => {
                    #[cfg(feature = "tracing")]
                    tracing::info!(table = name, "pgweave.migrate: table exists, skipped");
                    self.done_tables.insert(id);
                    self.report.skipped.push(name.to_string());
                    return Ok(());
                }
                IdempotencyPolicy::Recreate => {
                    tx.execute(&ddl::drop_table(name), &[])?;
                    #[cfg(feature = "tracing")]
                    tracing::info!(table = name, "pgweave.migrate: dropped table");
                    self.report.dropped.push(name.to_string());
                }
                IdempotencyPolicy::Fail => {}
            }
        }

        self.visiting.push(id);
        for ty in table.required_types() {
            self.enum_type(tx, ty)?;
        }
        for dependency in table.required_tables() {
            self.table(tx, dependency)?;
        }
        self.visiting.pop();

        let sql = ddl::create_table(table);
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %sql, "pgweave.migrate: create table");
        tx.execute(&sql, &[])?;
        #[cfg(feature = "tracing")]
        tracing::info!(table = name, "pgweave.migrate: created table");
        self.done_tables.insert(id);
        self.report.created.push(name.to_string());
        Ok(())
    }

    fn enum_type<E: Executor>(&mut self, tx: &mut Transaction<'_, E>, id: TypeId) -> Result<()> {
        if self.done_types.contains(&id) {
            return Ok(());
        }
        let registry = self.registry;
        let ty = registry.type_descriptor(id)?;
        if let Some(err) = ty.registration_error() {
            return Err(err.clone().context(format!("type {}", ty.name())));
        }
        let name = ty.name();

        if exists(tx, ddl::ENUM_EXISTS, name)? {
            match self.policy {
                IdempotencyPolicy::Ignore => {
                    #[cfg(feature = "tracing")]
                    tracing::info!(ty = name, "pgweave.migrate: type exists, skipped");
                    self.done_types.insert(id);
                    self.report.skipped.push(name.to_string());
                    return Ok(());
                }
                IdempotencyPolicy::Recreate => {
                    tx.execute(&ddl::drop_type(name), &[])?;
                    #[cfg(feature = "tracing")]
                    tracing::info!(ty = name, "pgweave.migrate: dropped type");
                    self.report.dropped.push(name.to_string());
                }
                IdempotencyPolicy::Fail => {}
            }
        }

        let sql = ddl::create_enum(ty);
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %sql, "pgweave.migrate: create type");
        tx.execute(&sql, &[])?;
        #[cfg(feature = "tracing")]
        tracing::info!(ty = name, "pgweave.migrate: created type");
        self.done_types.insert(id);
        self.report.created.push(name.to_string());
        Ok(())
    }
}
