//! PostgreSQL support for pgweave
//!
//! This crate provides the [`Executor`](pgweave_core::Executor) implementation
//! over the synchronous `postgres` client, together with the value and row
//! conversions it needs.
//!
//! ```no_run
//! use pgweave_core::{FieldDef, RecordDef, SchemaRegistry, Session, field};
//!
//! # fn main() -> pgweave_core::Result<()> {
//! let mut registry = SchemaRegistry::new();
//! let users = registry.register_table(
//!     &RecordDef::new("users")
//!         .field(FieldDef::integer("id"))
//!         .field(FieldDef::text("name")),
//! )?;
//!
//! let executor = pgweave_postgres::connect("localhost:5432", "school", "admin", "secret")?;
//! let mut session = Session::new(executor);
//! session.run(
//!     registry
//!         .table(users)?
//!         .update()
//!         .set("name", "Ada")
//!         .r#where(field("id").is_equal(1)),
//! )?;
//! # Ok(())
//! # }
//! ```

mod executor;
pub mod values;

pub use executor::{PostgresExecutor, config, connect};
pub use values::{PgParam, column_value, row_values};
