//! Schema registry: tables, columns and database types derived from record definitions.
//!
//! A [`SchemaRegistry`] owns every [`TableDescriptor`] and [`TypeDescriptor`] of
//! one logical database. Tables are derived from a [`RecordDef`], an explicit,
//! typed description of a host record (its fields, overrides and embedded
//! sub-records), and are addressed by [`TableId`] handles that survive renames.

mod column;
mod enumeration;
mod record;
mod registry;
mod table;

pub use column::{ColumnDescriptor, ForeignKey, ReferentialAction, ScalarKind};
pub use enumeration::{TypeDescriptor, TypeKind};
pub use record::{FieldDef, FieldType, Record, RecordDef};
pub use registry::{SchemaRegistry, TableId, TypeId};
pub use table::{Requirement, TableDescriptor};

/// Anything the database knows by name.
pub trait Named {
    fn name(&self) -> &str;
}

/// Database-level objects with a type kind (enumerations today).
pub trait Typed: Named {
    fn type_kind(&self) -> TypeKind;
}

/// Lower-cases a host-language name into the registry's key form.
pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Identifiers are interpolated into DDL, so only plain ones are accepted.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
