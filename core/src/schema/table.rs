use super::Named;
use super::column::ColumnDescriptor;
use super::record::{FieldDef, FieldType, Member, RecordDef};
use super::registry::{TableId, TypeId};
use crate::error::WeaveError;
use crate::query::{Query, QueryKind};
use hashbrown::HashMap;

/// Something a table needs to exist before it can be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Requirement {
    Table(TableId),
    EnumType(TypeId),
}

/// Schema of one logical table, owned by a [`SchemaRegistry`](super::SchemaRegistry).
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescriptor {
    pub(crate) name: String,
    columns: Vec<ColumnDescriptor>,
    index: HashMap<String, usize>,
    pub(crate) requirements: Vec<Requirement>,
    pub(crate) registration_error: Option<WeaveError>,
}

impl TableDescriptor {
    /// Derives the columns of `record`, flattening embedded records in place.
    /// A column declared twice keeps its first position and its last definition.
    pub(crate) fn derive(name: String, record: &RecordDef) -> Self {
        let mut table = TableDescriptor {
            name,
            columns: Vec::new(),
            index: HashMap::new(),
            requirements: Vec::new(),
            registration_error: None,
        };
        table.flatten(record);
        table
    }

    fn flatten(&mut self, record: &RecordDef) {
        for member in &record.members {
            match member {
                Member::Field(field) => self.insert_column(column_from_field(field)),
                Member::Embedded(inner) => self.flatten(inner),
            }
        }
    }

    fn insert_column(&mut self, column: ColumnDescriptor) {
        match self.index.get(&column.name) {
            Some(&position) => self.columns[position] = column,
            None => {
                self.index.insert(column.name.clone(), self.columns.len());
                self.columns.push(column);
            }
        }
    }

    /// Columns in declaration order, including ignored ones.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.index.get(name).map(|&position| &self.columns[position])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn required_tables(&self) -> impl Iterator<Item = TableId> + '_ {
        self.requirements.iter().filter_map(|requirement| match requirement {
            Requirement::Table(id) => Some(*id),
            Requirement::EnumType(_) => None,
        })
    }

    pub fn required_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.requirements.iter().filter_map(|requirement| match requirement {
            Requirement::EnumType(id) => Some(*id),
            Requirement::Table(_) => None,
        })
    }

    pub fn registration_error(&self) -> Option<&WeaveError> {
        self.registration_error.as_ref()
    }

    pub(crate) fn push_requirement(&mut self, requirement: Requirement) {
        if !self.requirements.contains(&requirement) {
            self.requirements.push(requirement);
        }
    }

    /// Starts a `SELECT` of `columns` (all columns when empty).
    pub fn select(&self, columns: &[&str]) -> Query<'_> {
        Query::new(self, QueryKind::Select, columns)
    }

    /// Starts an `INSERT` into `columns`; `values` must come in multiples of their count.
    pub fn insert(&self, columns: &[&str]) -> Query<'_> {
        Query::new(self, QueryKind::Insert, columns)
    }

    pub fn update(&self) -> Query<'_> {
        Query::new(self, QueryKind::Update, &[])
    }

    pub fn delete(&self) -> Query<'_> {
        Query::new(self, QueryKind::Delete, &[])
    }
}

impl Named for TableDescriptor {
    fn name(&self) -> &str {
        &self.name
    }
}

fn column_from_field(field: &FieldDef) -> ColumnDescriptor {
    let name = field
        .name
        .clone()
        .unwrap_or_else(|| field.field.to_lowercase());
    let sql_type = match (&field.sql_type, &field.ty) {
        (Some(sql_type), _) => sql_type.clone(),
        (None, FieldType::Scalar(kind)) => kind.default_sql_type().to_string(),
        (None, FieldType::Named(type_name)) => type_name.to_lowercase(),
    };
    ColumnDescriptor {
        name,
        sql_type,
        constraints: field.constraints.join(" "),
        foreign_key: field.foreign_key.clone(),
        ignored: field.ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, ForeignKey};

    fn id() -> RecordDef {
        RecordDef::new("Id").field(
            FieldDef::integer("Id")
                .sql_type("SERIAL")
                .constraint("PRIMARY KEY"),
        )
    }

    #[test]
    fn default_names_and_types() {
        let users = RecordDef::new("Users")
            .embed(id())
            .field(FieldDef::text("Name").constraint("NOT NULL"))
            .field(FieldDef::timestamp("CreatedAt"))
            .field(FieldDef::named("Role", "User_Role"))
            .field(FieldDef::integer("Cache").ignore());

        let table = TableDescriptor::derive("users".into(), &users);
        let columns: Vec<_> = table
            .columns()
            .iter()
            .map(|c| (c.name.as_str(), c.sql_type.as_str(), c.constraints.as_str()))
            .collect();

        assert_eq!(
            columns,
            vec![
                ("id", "SERIAL", "PRIMARY KEY"),
                ("name", "VARCHAR(256)", "NOT NULL"),
                ("createdat", "TIMESTAMPTZ", ""),
                ("role", "user_role", ""),
                ("cache", "INTEGER", ""),
            ]
        );
        assert!(table.column("cache").is_some_and(|c| c.ignored));
    }

    #[test]
    fn later_declaration_overrides_embedded_column() {
        let record = RecordDef::new("Notifications")
            .embed(id())
            .field(FieldDef::text("Title"))
            .field(FieldDef::integer("Id").sql_type("BIGSERIAL").constraint("PRIMARY KEY"));

        let table = TableDescriptor::derive("notifications".into(), &record);
        assert_eq!(table.columns().len(), 2);
        assert_eq!(table.columns()[0].name, "id");
        assert_eq!(table.columns()[0].sql_type, "BIGSERIAL");
    }

    #[test]
    fn foreign_keys_are_carried() {
        let record = RecordDef::new("Posts").field(
            FieldDef::integer("AuthorId")
                .name("author_id")
                .references(ForeignKey::new("users", "id")),
        );
        let table = TableDescriptor::derive("posts".into(), &record);
        assert_eq!(
            table.column("author_id").and_then(|c| c.foreign_key_clause()),
            Some("\n\tFOREIGN KEY (author_id) REFERENCES users(id)".to_string())
        );
    }
}
