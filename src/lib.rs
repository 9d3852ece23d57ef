//! # pgweave
//!
//! A schema registry, a runtime-validated query builder and a migration engine
//! for PostgreSQL.
//!
//! ## Quick Start
//!
//! ```rust
//! use pgweave::prelude::*;
//!
//! # fn main() -> pgweave::Result<()> {
//! let mut registry = SchemaRegistry::new();
//! let role = registry.register_enum_type("user_role", ["admin", "member"]);
//! let users = registry.register_table(
//!     &RecordDef::new("Users")
//!         .field(FieldDef::integer("Id").sql_type("SERIAL").constraint("PRIMARY KEY"))
//!         .field(FieldDef::text("Name").constraint("NOT NULL"))
//!         .field(FieldDef::named("Role", "user_role")),
//! )?;
//! registry.add_required_types(users, &[role])?;
//!
//! let query = registry
//!     .table(users)?
//!     .select(&["id", "name"])
//!     .r#where(field("role").is_equal("admin"))
//!     .order_ascending("name")
//!     .limit(10);
//! assert_eq!(
//!     query.to_sql(),
//!     "SELECT id, name FROM users WHERE role = $1 ORDER BY name ASC LIMIT 10"
//! );
//! query.validate()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! | Crate                | Contents                                         | Feature Flag    |
//! |----------------------|--------------------------------------------------|-----------------|
//! | `pgweave-core`       | registry, query builder, sessions, transactions | always          |
//! | `pgweave-migrations` | migration config, DDL, migration engine          | always          |
//! | `pgweave-postgres`   | executor over the `postgres` client, `connect`   | `postgres-sync` |

pub use pgweave_core as core;
pub use pgweave_migrations as migrations;

#[cfg(feature = "postgres-sync")]
pub use pgweave_postgres as postgres;

pub use pgweave_core::{ErrorKind, Result, TransactionStage, WeaveError};

pub mod prelude {
    pub use pgweave_core::query::{BuildStep, scan_exists};
    pub use pgweave_core::{
        Condition, ErrorKind, Executor, FieldDef, ForeignKey, JoinType, Named, Query, QueryKind,
        Record, RecordDef, ReferentialAction, Row, Rows, SchemaRegistry, Session, TableDescriptor,
        TableId, Transaction, TypeId, Value, WeaveError, and, compose, field, or,
    };
    pub use pgweave_migrations::{
        Database, IdempotencyPolicy, MigrationConfig, MigrationReport, Migrator, User,
    };

    #[cfg(feature = "postgres-sync")]
    pub use pgweave_postgres::{PostgresExecutor, connect};
}
