//! Core of pgweave: schema registry, query builder and the executor capability
//! everything else is built on.

pub mod error;
pub mod executor;
pub mod query;
pub mod row;
pub mod schema;
pub mod session;
mod trace;
pub mod value;

pub use error::{ErrorKind, Result, TransactionStage, WeaveError};
pub use executor::Executor;
pub use query::{
    Condition, Field, JoinOn, JoinType, Query, QueryKind, RowScanner, Statement, and, compose,
    field, or, scan_exists,
};
pub use row::{Row, Rows};
pub use schema::{
    ColumnDescriptor, FieldDef, FieldType, ForeignKey, Named, Record, RecordDef,
    ReferentialAction, Requirement, ScalarKind, SchemaRegistry, TableDescriptor, TableId,
    TypeDescriptor, TypeId, TypeKind, Typed,
};
pub use session::{Session, Transaction};
pub use value::{FromValue, Value, ValueKind};
