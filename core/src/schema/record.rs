use super::column::{ForeignKey, ScalarKind};

/// Declared type of a record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// A scalar with a default column type
    Scalar(ScalarKind),
    /// Any other named type, used lower-cased as the column type (e.g. an enum)
    Named(String),
}

/// One field of a host record and its column overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub(crate) field: String,
    pub(crate) ty: FieldType,
    pub(crate) name: Option<String>,
    pub(crate) sql_type: Option<String>,
    pub(crate) constraints: Vec<String>,
    pub(crate) foreign_key: Option<ForeignKey>,
    pub(crate) ignored: bool,
}

impl FieldDef {
    pub fn new(field: impl Into<String>, ty: FieldType) -> Self {
        Self {
            field: field.into(),
            ty,
            name: None,
            sql_type: None,
            constraints: Vec::new(),
            foreign_key: None,
            ignored: false,
        }
    }

    pub fn text(field: impl Into<String>) -> Self {
        Self::new(field, FieldType::Scalar(ScalarKind::Text))
    }

    pub fn integer(field: impl Into<String>) -> Self {
        Self::new(field, FieldType::Scalar(ScalarKind::Integer))
    }

    pub fn timestamp(field: impl Into<String>) -> Self {
        Self::new(field, FieldType::Scalar(ScalarKind::Timestamp))
    }

    /// A field whose host type has no default mapping, such as an enum.
    pub fn named(field: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(field, FieldType::Named(type_name.into()))
    }

    /// Overrides the column name (defaults to the lower-cased field name).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Overrides the column type.
    pub fn sql_type(mut self, sql_type: impl Into<String>) -> Self {
        self.sql_type = Some(sql_type.into());
        self
    }

    /// Appends a column constraint such as `NOT NULL` or `PRIMARY KEY`.
    pub fn constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    pub fn references(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_key = Some(foreign_key);
        self
    }

    /// Keeps the field on the host record but leaves it out of the table.
    pub fn ignore(mut self) -> Self {
        self.ignored = true;
        self
    }

    pub fn field_name(&self) -> &str {
        &self.field
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Member {
    Field(FieldDef),
    Embedded(RecordDef),
}

/// Typed description of a host record, the source a table is derived from.
///
/// ```
/// use pgweave_core::schema::{FieldDef, RecordDef};
///
/// let id = RecordDef::new("Id").field(
///     FieldDef::integer("Id").sql_type("SERIAL").constraint("PRIMARY KEY"),
/// );
/// let users = RecordDef::new("Users")
///     .embed(id)
///     .field(FieldDef::text("Name").constraint("NOT NULL"))
///     .field(FieldDef::timestamp("CreatedAt").name("created_at"));
/// assert_eq!(users.record_name(), "Users");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDef {
    pub(crate) name: String,
    pub(crate) members: Vec<Member>,
}

impl RecordDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.members.push(Member::Field(field));
        self
    }

    /// Flattens the columns of `record` into this one.
    pub fn embed(mut self, record: RecordDef) -> Self {
        self.members.push(Member::Embedded(record));
        self
    }

    pub fn record_name(&self) -> &str {
        &self.name
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Host types that describe their own table shape.
pub trait Record {
    fn record() -> RecordDef;
}
