//! DDL text and catalog probes
//!
//! Identifiers come from the schema registry or from validated user and
//! database names, so they are interpolated directly. Literals (enum labels,
//! passwords) are quoted with embedded quotes doubled.

use pgweave_core::{Named, TableDescriptor, TypeDescriptor};

pub const TABLE_EXISTS: &str = "SELECT tablename FROM pg_catalog.pg_tables WHERE tablename = $1";

pub const ENUM_EXISTS: &str =
    "SELECT typname FROM pg_catalog.pg_type WHERE typtype = 'e' AND typname = $1";

pub const ROLE_EXISTS: &str = "SELECT rolname FROM pg_catalog.pg_roles WHERE rolname = $1;";

pub const DATABASE_EXISTS: &str =
    "SELECT datname FROM pg_catalog.pg_database WHERE datname = $1;";

pub const DATABASES_OWNED_BY: &str = "SELECT datname FROM pg_catalog.pg_database d \
     INNER JOIN pg_catalog.pg_roles u ON d.datdba = u.oid WHERE rolname = $1;";

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `CREATE TABLE` for every non-ignored column, foreign keys inline after their column.
pub fn create_table(table: &TableDescriptor) -> String {
    let columns: Vec<String> = table
        .columns()
        .iter()
        .filter(|column| !column.ignored)
        .map(|column| {
            let mut definition = format!("\n\t{} {}", column.name, column.sql_type);
            if !column.constraints.is_empty() {
                definition.push(' ');
                definition.push_str(&column.constraints);
            }
            if let Some(clause) = column.foreign_key_clause() {
                definition.push(',');
                definition.push_str(&clause);
            }
            definition
        })
        .collect();
    format!("CREATE TABLE {} ({}\n);", table.name(), columns.join(","))
}

pub fn drop_table(name: &str) -> String {
    format!("DROP TABLE {name} CASCADE;")
}

/// `CREATE TYPE ... AS ENUM` with lower-cased, quoted labels.
pub fn create_enum(ty: &TypeDescriptor) -> String {
    let labels: Vec<String> = ty
        .values()
        .iter()
        .map(|label| quote_literal(&label.to_lowercase()))
        .collect();
    format!("CREATE TYPE {} AS ENUM ({});", ty.name(), labels.join(", "))
}

pub fn drop_type(name: &str) -> String {
    format!("DROP TYPE {name} CASCADE;")
}

pub fn create_user(name: &str, password: &str) -> String {
    format!(
        "CREATE USER {name}\n\tWITH LOGIN\n\tPASSWORD {};",
        quote_literal(password)
    )
}

pub fn drop_user(name: &str) -> String {
    format!("DROP USER {name};")
}

pub fn create_database(name: &str, owner: &str) -> String {
    format!("CREATE DATABASE {name} WITH OWNER = {owner};")
}

pub fn drop_database(name: &str) -> String {
    format!("DROP DATABASE {name};")
}

/// Role names are lower-case with spaces turned into underscores.
pub fn role_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgweave_core::{FieldDef, ForeignKey, RecordDef, ReferentialAction, SchemaRegistry};

    #[test]
    fn create_table_text() {
        let mut registry = SchemaRegistry::new();
        let id = registry
            .register_table(
                &RecordDef::new("Users")
                    .field(FieldDef::integer("Id").sql_type("SERIAL").constraint("PRIMARY KEY"))
                    .field(FieldDef::text("Name").constraint("NOT NULL"))
                    .field(FieldDef::text("Email").constraint("UNIQUE"))
                    .field(FieldDef::text("Session").ignore()),
            )
            .unwrap();

        assert_eq!(
            create_table(registry.table(id).unwrap()),
            "CREATE TABLE users (\n\tid SERIAL PRIMARY KEY,\n\tname VARCHAR(256) NOT NULL,\n\temail VARCHAR(256) UNIQUE\n);"
        );
    }

    #[test]
    fn create_table_with_foreign_key() {
        let mut registry = SchemaRegistry::new();
        let id = registry
            .register_table(
                &RecordDef::new("users_notifications").field(
                    FieldDef::integer("UserId")
                        .name("user_id")
                        .references(ForeignKey::new("users", "id").on_delete(ReferentialAction::Cascade)),
                ),
            )
            .unwrap();

        assert_eq!(
            create_table(registry.table(id).unwrap()),
            "CREATE TABLE users_notifications (\n\tuser_id INTEGER,\n\tFOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE\n);"
        );
    }

    #[test]
    fn enum_labels_are_lowercased_and_quoted() {
        let mut registry = SchemaRegistry::new();
        let id = registry.register_enum_type("user_role", ["STUDENT", "Teacher", "o'neil"]);
        assert_eq!(
            create_enum(registry.type_descriptor(id).unwrap()),
            "CREATE TYPE user_role AS ENUM ('student', 'teacher', 'o''neil');"
        );
    }

    #[test]
    fn environment_statements() {
        assert_eq!(role_name(" Admin User "), "admin_user");
        assert_eq!(
            create_user("admin_user", "s3cr'et"),
            "CREATE USER admin_user\n\tWITH LOGIN\n\tPASSWORD 's3cr''et';"
        );
        assert_eq!(drop_user("admin_user"), "DROP USER admin_user;");
        assert_eq!(
            create_database("school", "admin_user"),
            "CREATE DATABASE school WITH OWNER = admin_user;"
        );
        assert_eq!(drop_database("school"), "DROP DATABASE school;");
        assert_eq!(drop_table("users"), "DROP TABLE users CASCADE;");
        assert_eq!(drop_type("user_role"), "DROP TYPE user_role CASCADE;");
    }
}
