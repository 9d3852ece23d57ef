use core::fmt;

/// Host scalar kinds that map to a default column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Text,
    Integer,
    Timestamp,
}

impl ScalarKind {
    /// Column type used when a field does not override it.
    pub const fn default_sql_type(self) -> &'static str {
        match self {
            ScalarKind::Text => "VARCHAR(256)",
            ScalarKind::Integer => "INTEGER",
            ScalarKind::Timestamp => "TIMESTAMPTZ",
        }
    }
}

/// Action taken on referencing rows when the referenced row changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferentialAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sql = match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        };
        f.write_str(sql)
    }
}

/// Foreign key target of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub on_update: Option<ReferentialAction>,
    pub on_delete: Option<ReferentialAction>,
}

impl ForeignKey {
    pub fn new(table: impl AsRef<str>, column: impl AsRef<str>) -> Self {
        Self {
            table: super::normalize_name(table.as_ref()),
            column: super::normalize_name(column.as_ref()),
            on_update: None,
            on_delete: None,
        }
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Renders the table constraint for the referencing `column`.
    pub fn clause(&self, column: &str) -> String {
        let mut clause = format!(
            "\n\tFOREIGN KEY ({column}) REFERENCES {}({})",
            self.table, self.column
        );
        if let Some(action) = self.on_update {
            clause.push_str(&format!(" ON UPDATE {action}"));
        }
        if let Some(action) = self.on_delete {
            clause.push_str(&format!(" ON DELETE {action}"));
        }
        clause
    }
}

/// One column of a table, fixed once the table is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub sql_type: String,
    pub constraints: String,
    pub foreign_key: Option<ForeignKey>,
    /// Kept as a host field but left out of the generated table.
    pub ignored: bool,
}

impl ColumnDescriptor {
    pub fn foreign_key_clause(&self) -> Option<String> {
        self.foreign_key.as_ref().map(|fk| fk.clause(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_key_clause_with_actions() {
        let fk = ForeignKey::new("Users", "Id")
            .on_update(ReferentialAction::Cascade)
            .on_delete(ReferentialAction::SetNull);

        assert_eq!(
            fk.clause("issuer_id"),
            "\n\tFOREIGN KEY (issuer_id) REFERENCES users(id) ON UPDATE CASCADE ON DELETE SET NULL"
        );
    }

    #[test]
    fn foreign_key_clause_plain() {
        let fk = ForeignKey::new("notifications", "id");
        assert_eq!(
            fk.clause("notification_id"),
            "\n\tFOREIGN KEY (notification_id) REFERENCES notifications(id)"
        );
    }
}
