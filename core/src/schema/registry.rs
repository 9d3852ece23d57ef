use super::enumeration::TypeDescriptor;
use super::record::{Record, RecordDef};
use super::table::{Requirement, TableDescriptor};
use super::{Named, is_identifier, normalize_name};
use crate::error::{Result, WeaveError};
use crate::value::Value;
use core::sync::atomic::{AtomicU32, Ordering};
use hashbrown::HashMap;

static NEXT_REGISTRY: AtomicU32 = AtomicU32::new(0);

/// Handle to a table inside one [`SchemaRegistry`]. Stays valid across renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId {
    registry: u32,
    index: u32,
}

/// Handle to a type inside one [`SchemaRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId {
    registry: u32,
    index: u32,
}

/// Tables and types of one logical database.
///
/// Descriptors live in registration order and are never removed; names are
/// keys into them, so a rename moves the key and every [`TableId`] held by a
/// dependent table observes the new name.
///
/// Registration takes `&mut self`, so concurrent registration has to go
/// through whatever lock the caller wraps the registry in.
#[derive(Debug)]
pub struct SchemaRegistry {
    id: u32,
    tables: Vec<TableDescriptor>,
    table_keys: HashMap<String, TableId>,
    types: Vec<TypeDescriptor>,
    type_keys: HashMap<String, TypeId>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            id: NEXT_REGISTRY.fetch_add(1, Ordering::Relaxed),
            tables: Vec::new(),
            table_keys: HashMap::new(),
            types: Vec::new(),
            type_keys: HashMap::new(),
        }
    }

    /// Derives and registers the table described by `record`.
    ///
    /// Registering a name that is already present returns the cached table
    /// unchanged.
    pub fn register_table(&mut self, record: &RecordDef) -> Result<TableId> {
        let name = normalize_name(record.record_name());
        if let Some(&id) = self.table_keys.get(&name) {
            return Ok(id);
        }
        if !is_identifier(&name) {
            return Err(WeaveError::InvalidType(format!(
                "{:?} is not a valid table name",
                record.record_name()
            )));
        }
        if record.is_empty() {
            return Err(WeaveError::InvalidType(format!(
                "{} has no fields to derive columns from",
                record.record_name()
            )));
        }

        let id = TableId {
            registry: self.id,
            index: self.tables.len() as u32,
        };
        self.tables.push(TableDescriptor::derive(name.clone(), record));
        self.table_keys.insert(name, id);
        Ok(id)
    }

    pub fn register<R: Record>(&mut self) -> Result<TableId> {
        self.register_table(&R::record())
    }

    /// Moves `id` to `new_name`. Fails with `Syntax` when the name is taken.
    pub fn rename(&mut self, id: TableId, new_name: &str) -> Result<()> {
        let new_name = normalize_name(new_name);
        if !is_identifier(&new_name) {
            return Err(WeaveError::Syntax(format!(
                "{new_name:?} is not a valid table name"
            )));
        }
        let old_name = self.table(id)?.name.clone();
        if old_name == new_name {
            return Ok(());
        }
        if self.table_keys.contains_key(&new_name) {
            return Err(WeaveError::Syntax(format!(
                "cannot rename {old_name}: table {new_name} already exists"
            )));
        }

        self.table_keys.remove(&old_name);
        self.table_keys.insert(new_name.clone(), id);
        self.tables[id.index as usize].name = new_name;
        Ok(())
    }

    /// Declares that `id` needs `dependencies` created first.
    ///
    /// Every dependency must already be registered here; the first one that is
    /// not fails with `NotFound`, and that error is also stamped on the table.
    pub fn add_required_tables(&mut self, id: TableId, dependencies: &[TableId]) -> Result<()> {
        self.table(id)?;
        for &dependency in dependencies {
            let missing = self.table(dependency).err();
            if let Some(err) = missing {
                let err = err.context(format!(
                    "table {} requires an unregistered table",
                    self.tables[id.index as usize].name
                ));
                self.tables[id.index as usize].registration_error = Some(err.clone());
                return Err(err);
            }
            self.tables[id.index as usize].push_requirement(Requirement::Table(dependency));
        }
        Ok(())
    }

    /// Declares that `id` needs `types` created first. Types are not checked here;
    /// one that does not resolve fails the migration.
    pub fn add_required_types(&mut self, id: TableId, types: &[TypeId]) -> Result<()> {
        self.table(id)?;
        let table = &mut self.tables[id.index as usize];
        for &ty in types {
            table.push_requirement(Requirement::EnumType(ty));
        }
        Ok(())
    }

    /// Registers an enumeration type. Invalid values do not fail here: the
    /// descriptor carries the error and any migration needing it fails with it.
    /// Registering a name again replaces the previous definition.
    pub fn register_enum_type<I, V>(&mut self, name: &str, values: I) -> TypeId
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let descriptor =
            TypeDescriptor::enumeration(name, values.into_iter().map(Into::into).collect());

        if let Some(&id) = self.type_keys.get(descriptor.name()) {
            self.types[id.index as usize] = descriptor;
            return id;
        }

        let id = TypeId {
            registry: self.id,
            index: self.types.len() as u32,
        };
        self.type_keys.insert(descriptor.name.clone(), id);
        self.types.push(descriptor);
        id
    }

    pub fn table(&self, id: TableId) -> Result<&TableDescriptor> {
        if id.registry != self.id {
            return Err(WeaveError::NotFound(
                "table belongs to another registry".to_string(),
            ));
        }
        self.tables
            .get(id.index as usize)
            .ok_or_else(|| WeaveError::NotFound(format!("table #{} is not registered", id.index)))
    }

    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.table_keys.get(&normalize_name(name)).copied()
    }

    pub fn table_named(&self, name: &str) -> Option<&TableDescriptor> {
        self.table_id(name)
            .map(|id| &self.tables[id.index as usize])
    }

    /// Tables in registration order.
    pub fn tables(&self) -> impl Iterator<Item = (TableId, &TableDescriptor)> + '_ {
        let registry = self.id;
        self.tables.iter().enumerate().map(move |(index, table)| {
            (
                TableId {
                    registry,
                    index: index as u32,
                },
                table,
            )
        })
    }

    pub fn type_descriptor(&self, id: TypeId) -> Result<&TypeDescriptor> {
        if id.registry != self.id {
            return Err(WeaveError::NotFound(
                "type belongs to another registry".to_string(),
            ));
        }
        self.types
            .get(id.index as usize)
            .ok_or_else(|| WeaveError::NotFound(format!("type #{} is not registered", id.index)))
    }

    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.type_keys.get(&normalize_name(name)).copied()
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> + '_ {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Fails with the first registration error carried by any table.
    pub fn validate(&self) -> Result<()> {
        for table in &self.tables {
            if let Some(err) = &table.registration_error {
                return Err(err.clone().context(format!("table {}", table.name)));
            }
        }
        Ok(())
    }
}
