//! pgweave Migrations - bring a registry's objects into a running database
//!
//! This crate provides:
//! - [`MigrationConfig`], loaded from TOML or built in code
//! - [`Migrator::migrate_relations`]: enum types and tables in dependency order,
//!   inside one transaction, followed by the queued populator statements
//! - [`Migrator::drop_relations`]
//! - [`Migrator::migrate_users`] / [`Migrator::migrate_database`]: login roles
//!   and databases, with optional undo on failure
//!
//! ```ignore
//! use pgweave_migrations::{MigrationConfig, Migrator};
//!
//! let config = MigrationConfig::enabled().recreate_existing();
//! let mut migrator = Migrator::new(&registry, config);
//! migrator.populate(roles.insert(&["name"]).values(["admin", "member"]));
//! let report = migrator.migrate_relations(&mut executor)?;
//! ```

pub mod config;
pub mod ddl;
mod environment;
mod migrator;

pub use config::{ConfigError, IdempotencyPolicy, MigrationConfig};
pub use environment::{Database, User};
pub use migrator::{MigrationReport, Migrator};
