//! In-memory executor that plays the part of a Postgres server.
//!
//! It understands the DDL and catalog probes issued by the migration engine,
//! keeps a statement log, snapshots its catalog on `BEGIN` so `ROLLBACK`
//! restores it, and can be told to fail statements that contain a pattern.

#![allow(dead_code)]

use pgweave::migrations::ddl;
use pgweave::prelude::*;
use pgweave::{Result, TransactionStage};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub tables: BTreeSet<String>,
    pub types: BTreeSet<String>,
    pub roles: BTreeSet<String>,
    /// database name -> owner
    pub databases: BTreeMap<String, String>,
    /// table name -> inserted row count
    pub rows: BTreeMap<String, usize>,
}

#[derive(Debug, Default)]
pub struct MockExecutor {
    pub catalog: Catalog,
    snapshot: Option<Catalog>,
    pub log: Vec<String>,
    fail_patterns: Vec<String>,
    fail_rollback: bool,
    results: VecDeque<Rows>,
}

fn failed(message: impl Into<String>) -> WeaveError {
    WeaveError::FailedOperation(message.into())
}

/// The identifier after `prefix`, up to whitespace, `(` or `;`.
fn object_name<'a>(sql: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = sql.strip_prefix(prefix)?;
    rest.split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .next()
        .filter(|name| !name.is_empty())
}

fn exists_rows(column: &str, found: bool, name: &str) -> Rows {
    let rows = Rows::new(vec![column.to_string()]);
    if found {
        rows.with_row(vec![Value::from(name)])
    } else {
        rows
    }
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every statement containing `pattern` fails with `FailedOperation`.
    pub fn fail_when(mut self, pattern: &str) -> Self {
        self.fail_patterns.push(pattern.to_string());
        self
    }

    pub fn fail_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    /// Rows handed back, in order, to queries that are not catalog probes.
    pub fn returning(mut self, rows: Rows) -> Self {
        self.results.push_back(rows);
        self
    }

    pub fn with_table(mut self, name: &str) -> Self {
        self.catalog.tables.insert(name.to_string());
        self
    }

    pub fn with_type(mut self, name: &str) -> Self {
        self.catalog.types.insert(name.to_string());
        self
    }

    pub fn with_role(mut self, name: &str) -> Self {
        self.catalog.roles.insert(name.to_string());
        self
    }

    pub fn with_database(mut self, name: &str, owner: &str) -> Self {
        self.catalog
            .databases
            .insert(name.to_string(), owner.to_string());
        self
    }

    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Logged statements starting with `prefix`.
    pub fn statements(&self, prefix: &str) -> Vec<&str> {
        self.log
            .iter()
            .map(String::as_str)
            .filter(|sql| sql.starts_with(prefix))
            .collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.statements(prefix).len()
    }

    fn check_injected(&self, sql: &str) -> Result<()> {
        match self.fail_patterns.iter().find(|p| sql.contains(p.as_str())) {
            Some(pattern) => Err(failed(format!("injected failure on {pattern:?}"))),
            None => Ok(()),
        }
    }

    fn apply(&mut self, sql: &str) -> Result<u64> {
        let catalog = &mut self.catalog;
        if let Some(name) = object_name(sql, "CREATE TABLE ") {
            for referenced in sql.split("REFERENCES ").skip(1) {
                let target = referenced.split('(').next().unwrap_or_default();
                if !catalog.tables.contains(target) {
                    return Err(failed(format!("relation \"{target}\" does not exist")));
                }
            }
            if !catalog.tables.insert(name.to_string()) {
                return Err(failed(format!("relation \"{name}\" already exists")));
            }
        } else if let Some(name) = object_name(sql, "DROP TABLE ") {
            if !catalog.tables.remove(name) {
                return Err(failed(format!("table \"{name}\" does not exist")));
            }
            catalog.rows.remove(name);
        } else if let Some(name) = object_name(sql, "CREATE TYPE ") {
            if !catalog.types.insert(name.to_string()) {
                return Err(failed(format!("type \"{name}\" already exists")));
            }
        } else if let Some(name) = object_name(sql, "DROP TYPE ") {
            if !catalog.types.remove(name) {
                return Err(failed(format!("type \"{name}\" does not exist")));
            }
        } else if let Some(name) = object_name(sql, "CREATE USER ") {
            if !catalog.roles.insert(name.to_string()) {
                return Err(failed(format!("role \"{name}\" already exists")));
            }
        } else if let Some(name) = object_name(sql, "DROP USER ") {
            if catalog.databases.values().any(|owner| owner == name) {
                return Err(failed(format!("role \"{name}\" owns databases")));
            }
            if !catalog.roles.remove(name) {
                return Err(failed(format!("role \"{name}\" does not exist")));
            }
        } else if let Some(name) = object_name(sql, "CREATE DATABASE ") {
            let owner = sql
                .split("OWNER = ")
                .nth(1)
                .map(|rest| rest.trim_end_matches(';').trim())
                .unwrap_or_default();
            if !catalog.roles.contains(owner) {
                return Err(failed(format!("role \"{owner}\" does not exist")));
            }
            if catalog.databases.contains_key(name) {
                return Err(failed(format!("database \"{name}\" already exists")));
            }
            catalog.databases.insert(name.to_string(), owner.to_string());
        } else if let Some(name) = object_name(sql, "DROP DATABASE ") {
            if catalog.databases.remove(name).is_none() {
                return Err(failed(format!("database \"{name}\" does not exist")));
            }
        } else if let Some(name) = object_name(sql, "INSERT INTO ") {
            if !catalog.tables.contains(name) {
                return Err(failed(format!("relation \"{name}\" does not exist")));
            }
            let inserted = sql.matches("),(").count() + 1;
            *catalog.rows.entry(name.to_string()).or_default() += inserted;
            return Ok(inserted as u64);
        }
        Ok(0)
    }

    fn probe(&self, sql: &str, params: &[Value]) -> Option<Rows> {
        let name = match params.first() {
            Some(Value::Text(name)) => name.as_str(),
            _ => return None,
        };
        let catalog = &self.catalog;
        let rows = match sql {
            ddl::TABLE_EXISTS => exists_rows("tablename", catalog.tables.contains(name), name),
            ddl::ENUM_EXISTS => exists_rows("typname", catalog.types.contains(name), name),
            ddl::ROLE_EXISTS => exists_rows("rolname", catalog.roles.contains(name), name),
            ddl::DATABASE_EXISTS => {
                exists_rows("datname", catalog.databases.contains_key(name), name)
            }
            ddl::DATABASES_OWNED_BY => {
                let mut rows = Rows::new(vec!["datname".to_string()]);
                for (database, owner) in &catalog.databases {
                    if owner == name {
                        rows.push(vec![Value::from(database.as_str())]);
                    }
                }
                rows
            }
            _ => return None,
        };
        Some(rows)
    }
}

impl Executor for MockExecutor {
    fn execute(&mut self, sql: &str, _params: &[Value]) -> Result<u64> {
        self.log.push(sql.to_string());
        self.check_injected(sql)?;
        self.apply(sql)
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Rows> {
        self.log.push(sql.to_string());
        self.check_injected(sql)?;
        if let Some(rows) = self.probe(sql, params) {
            return Ok(rows);
        }
        self.apply(sql)?;
        Ok(self
            .results
            .pop_front()
            .unwrap_or_else(|| Rows::new(Vec::new())))
    }

    fn begin(&mut self) -> Result<()> {
        self.log.push("BEGIN".to_string());
        if self.snapshot.is_some() {
            return Err(WeaveError::transaction(
                TransactionStage::Start,
                "a transaction is already in progress",
            ));
        }
        self.snapshot = Some(self.catalog.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.log.push("COMMIT".to_string());
        self.check_injected("COMMIT")?;
        self.snapshot = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.log.push("ROLLBACK".to_string());
        if self.fail_rollback {
            return Err(WeaveError::transaction(
                TransactionStage::Rollback,
                "connection reset",
            ));
        }
        if let Some(snapshot) = self.snapshot.take() {
            self.catalog = snapshot;
        }
        Ok(())
    }
}

/// Users, Courses and Enrollments, where enrollments reference both and
/// users carry the `user_role` enum.
pub struct School {
    pub registry: SchemaRegistry,
    pub role: TypeId,
    pub users: TableId,
    pub courses: TableId,
    pub enrollments: TableId,
}

pub fn school() -> School {
    let mut registry = SchemaRegistry::new();
    let role = registry.register_enum_type("user_role", ["STUDENT", "TEACHER"]);
    let users = registry
        .register_table(
            &RecordDef::new("Users")
                .field(FieldDef::integer("Id").sql_type("SERIAL").constraint("PRIMARY KEY"))
                .field(FieldDef::text("Name").constraint("NOT NULL"))
                .field(FieldDef::text("Email").constraint("UNIQUE"))
                .field(FieldDef::named("Role", "user_role"))
                .field(FieldDef::text("Session").ignore()),
        )
        .unwrap();
    let courses = registry
        .register_table(
            &RecordDef::new("Courses")
                .field(FieldDef::integer("Id").sql_type("SERIAL").constraint("PRIMARY KEY"))
                .field(FieldDef::text("Title"))
                .field(FieldDef::integer("TeacherId").name("teacher_id").references(
                    ForeignKey::new("users", "id").on_delete(ReferentialAction::Cascade),
                )),
        )
        .unwrap();
    let enrollments = registry
        .register_table(
            &RecordDef::new("Enrollments")
                .field(
                    FieldDef::integer("UserId")
                        .name("user_id")
                        .references(ForeignKey::new("users", "id")),
                )
                .field(
                    FieldDef::integer("CourseId")
                        .name("course_id")
                        .references(ForeignKey::new("courses", "id")),
                ),
        )
        .unwrap();

    registry.add_required_types(users, &[role]).unwrap();
    registry.add_required_tables(courses, &[users]).unwrap();
    registry
        .add_required_tables(enrollments, &[users, courses])
        .unwrap();

    School {
        registry,
        role,
        users,
        courses,
        enrollments,
    }
}
