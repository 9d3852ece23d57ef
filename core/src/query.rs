//! Stateful, late-validated query builder
//!
//! A [`Query`] is created by a table's `select`/`insert`/`update`/`delete`
//! factory and grows one clause at a time. Nothing is checked against the
//! schema while chaining: field references are collected and resolved once,
//! when the query is submitted. The first misuse is kept as the query's
//! terminal error and every later call becomes a no-op.
//!
//! ```
//! use pgweave_core::query::{compose, and, field, or};
//! use pgweave_core::schema::{FieldDef, RecordDef, SchemaRegistry};
//!
//! let mut registry = SchemaRegistry::new();
//! let users = registry
//!     .register_table(
//!         &RecordDef::new("Users")
//!             .field(FieldDef::integer("Id"))
//!             .field(FieldDef::text("Name")),
//!     )
//!     .unwrap();
//! let users = registry.table(users).unwrap();
//!
//! let query = users.select(&["name"]).r#where(or([
//!     field("id").is_equal(1),
//!     compose(and([field("name").is_equal("a"), field("id").is_greater_than(2)])),
//! ]));
//! assert_eq!(
//!     query.to_sql(),
//!     "SELECT name FROM users WHERE id = $1 OR (name = $2 AND id > $3)"
//! );
//! assert!(query.validate().is_ok());
//! ```

mod condition;
mod join;

pub use condition::{Condition, Field, and, compose, field, or};
pub use join::{JoinOn, JoinType};

use crate::error::{Result, WeaveError};
use crate::row::Rows;
use crate::schema::{Named, TableDescriptor};
use crate::value::Value;
use core::fmt;
use hashbrown::HashMap;

/// Statement kind a query was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            QueryKind::Select => "SELECT",
            QueryKind::Insert => "INSERT",
            QueryKind::Update => "UPDATE",
            QueryKind::Delete => "DELETE",
        };
        f.write_str(keyword)
    }
}

/// Clause category of a block. Clauses must be appended in this order, except
/// `LIMIT` and `OFFSET`, which share a rank and may come in either order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildStep {
    Start,
    Alias,
    Join,
    Set,
    Values,
    Where,
    GroupBy,
    Order,
    Limit,
    Offset,
    Returning,
}

impl BuildStep {
    fn rank(self) -> u8 {
        match self {
            BuildStep::Start => 0,
            BuildStep::Alias => 1,
            BuildStep::Join => 2,
            BuildStep::Set => 3,
            BuildStep::Values => 4,
            BuildStep::Where => 5,
            BuildStep::GroupBy => 6,
            BuildStep::Order => 7,
            BuildStep::Limit | BuildStep::Offset => 8,
            BuildStep::Returning => 9,
        }
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clause = match self {
            BuildStep::Start => "statement head",
            BuildStep::Alias => "AS",
            BuildStep::Join => "JOIN",
            BuildStep::Set => "SET",
            BuildStep::Values => "VALUES",
            BuildStep::Where => "WHERE",
            BuildStep::GroupBy => "GROUP BY",
            BuildStep::Order => "ORDER BY",
            BuildStep::Limit => "LIMIT",
            BuildStep::Offset => "OFFSET",
            BuildStep::Returning => "RETURNING",
        };
        f.write_str(clause)
    }
}

/// Callback that consumes the rows of a query and reports whether any were found.
pub type RowScanner<'q> = Box<dyn FnMut(&mut Rows) -> Result<bool> + 'q>;

/// Scanner that records whether at least one row came back and never fails.
pub fn scan_exists(exists: &mut bool) -> impl FnMut(&mut Rows) -> Result<bool> + '_ {
    move |rows| {
        *exists = rows.next_row().is_some();
        Ok(true)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Block {
    text: String,
    step: BuildStep,
}

/// Single-use builder for one statement on one table.
#[must_use = "a query does nothing until it is run"]
pub struct Query<'q> {
    kind: QueryKind,
    table: &'q TableDescriptor,
    blocks: Vec<Block>,
    step: BuildStep,
    placeholder_index: usize,
    values: Vec<Value>,
    aliases: HashMap<String, &'q TableDescriptor>,
    referenced_fields: Vec<String>,
    required_value_len: usize,
    error: Option<WeaveError>,
    scanner: Option<RowScanner<'q>>,
    throw_on_found: bool,
}

/// A validated query ready for an executor.
pub struct Statement<'q> {
    pub sql: String,
    pub params: Vec<Value>,
    pub scanner: Option<RowScanner<'q>>,
    pub throw_on_found: bool,
}

impl fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .field("scanner", &self.scanner.is_some())
            .field("throw_on_found", &self.throw_on_found)
            .finish()
    }
}

impl<'q> Query<'q> {
    pub(crate) fn new(table: &'q TableDescriptor, kind: QueryKind, columns: &[&str]) -> Self {
        let mut query = Query {
            kind,
            table,
            blocks: Vec::new(),
            step: BuildStep::Start,
            placeholder_index: 1,
            values: Vec::new(),
            aliases: HashMap::new(),
            referenced_fields: Vec::new(),
            required_value_len: 0,
            error: table
                .registration_error()
                .map(|err| err.clone().context(format!("table {}", table.name()))),
            scanner: None,
            throw_on_found: false,
        };
        query.aliases.insert(String::new(), table);

        let name = table.name();
        let head = match kind {
            QueryKind::Select if columns.is_empty() => format!("SELECT * FROM {name}"),
            QueryKind::Select => format!("SELECT {} FROM {name}", columns.join(", ")),
            QueryKind::Insert => {
                if columns.is_empty() {
                    query.fail(WeaveError::Empty(format!(
                        "INSERT INTO {name} needs at least one column"
                    )));
                }
                query.required_value_len = columns.len();
                format!("INSERT INTO {name} ({})", columns.join(", "))
            }
            QueryKind::Update => format!("UPDATE {name}"),
            QueryKind::Delete => format!("DELETE FROM {name}"),
        };
        query.register(columns.iter().copied());
        query.push_block(head);
        query
    }

    //--------------------------------------------------------------------------
    // Build state
    //--------------------------------------------------------------------------

    fn fail(&mut self, error: WeaveError) {
        self.error.get_or_insert(error);
    }

    /// Moves the builder into `step`, or records why it cannot.
    fn enter(&mut self, step: BuildStep, allowed: &[QueryKind], repeatable: bool) -> bool {
        if self.error.is_some() {
            return false;
        }
        if !allowed.contains(&self.kind) {
            let allowed: Vec<String> = allowed.iter().map(ToString::to_string).collect();
            self.fail(WeaveError::InvalidMethodChain(format!(
                "{step} is not valid on {}; must be {}",
                self.kind,
                allowed.join(" | ")
            )));
            return false;
        }
        if step.rank() < self.step.rank() {
            self.fail(WeaveError::InvalidMethodChain(format!(
                "{step} cannot follow {}",
                self.step
            )));
            return false;
        }
        let seen = self.blocks.iter().any(|block| block.step == step);
        if seen && (!repeatable || step != self.step) {
            self.fail(WeaveError::InvalidMethodChain(format!(
                "{step} may appear only once"
            )));
            return false;
        }
        self.step = step;
        true
    }

    fn push_block(&mut self, text: String) {
        self.blocks.push(Block {
            text,
            step: self.step,
        });
    }

    fn extend_block(&mut self, text: &str) {
        if let Some(block) = self.blocks.last_mut() {
            block.text.push_str(text);
        }
    }

    fn placeholder(&mut self, value: Value) -> String {
        let placeholder = format!("${}", self.placeholder_index);
        self.placeholder_index += 1;
        self.values.push(value);
        placeholder
    }

    fn register<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) {
        self.referenced_fields
            .extend(fields.into_iter().map(str::to_string));
    }

    //--------------------------------------------------------------------------
    // Clauses
    //--------------------------------------------------------------------------

    /// `VALUES ($1,$2),($3,$4)`: one group per multiple of the INSERT column count.
    ///
    /// UPDATE statements declare no column list, so `values` on them is always
    /// a syntax error; use [`set`](Self::set).
    pub fn values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        if !self.enter(
            BuildStep::Values,
            &[QueryKind::Insert, QueryKind::Update],
            false,
        ) {
            return self;
        }
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let width = self.required_value_len;
        if width == 0 || values.is_empty() || values.len() % width != 0 {
            self.fail(WeaveError::Syntax(format!(
                "invalid value amount: wanted a positive multiple of {width}, received {}",
                values.len()
            )));
            return self;
        }

        let mut groups = Vec::with_capacity(values.len() / width);
        let mut group = Vec::with_capacity(width);
        for value in values {
            group.push(self.placeholder(value));
            if group.len() == width {
                groups.push(format!("({})", group.join(",")));
                group.clear();
            }
        }
        self.push_block(format!("VALUES {}", groups.join(",")));
        self
    }

    /// `SET field = $n`; further calls continue the same clause.
    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        let continuing = self.step == BuildStep::Set;
        if !self.enter(BuildStep::Set, &[QueryKind::Update], true) {
            return self;
        }
        self.register([field]);
        let placeholder = self.placeholder(value.into());
        if continuing {
            self.extend_block(&format!(", {field} = {placeholder}"));
        } else {
            self.push_block(format!("SET {field} = {placeholder}"));
        }
        self
    }

    /// Attaches the statement's single predicate tree. An empty condition adds
    /// no clause; a second call is a chain error either way.
    pub fn r#where(mut self, condition: Condition) -> Self {
        if self.error.is_some() {
            return self;
        }
        if self.kind == QueryKind::Insert {
            self.fail(WeaveError::InvalidMethodChain(
                "WHERE is not valid on INSERT; must be SELECT | UPDATE | DELETE".to_string(),
            ));
            return self;
        }
        if self.blocks.iter().any(|block| block.step == BuildStep::Where) {
            self.fail(WeaveError::InvalidMethodChain(
                "WHERE may appear only once".to_string(),
            ));
            return self;
        }
        let (condition, fields, error) = condition.into_parts();
        if let Some(error) = error {
            self.fail(error);
            return self;
        }
        if condition.is_empty() {
            return self;
        }
        if !self.enter(
            BuildStep::Where,
            &[QueryKind::Select, QueryKind::Update, QueryKind::Delete],
            false,
        ) {
            return self;
        }

        self.referenced_fields.extend(fields);
        let mut text = String::from("WHERE ");
        condition.render_into(&mut text, &mut self.placeholder_index, &mut self.values);
        self.push_block(text);
        self
    }

    /// Gives the target table an alias. Unaliased references then no longer resolve.
    pub fn alias(mut self, alias: &str) -> Self {
        if !self.enter(BuildStep::Alias, &[QueryKind::Select], false) {
            return self;
        }
        if !crate::schema::is_identifier(alias) {
            self.fail(WeaveError::Syntax(format!("{alias:?} is not a valid alias")));
            return self;
        }
        if let Some(table) = self.aliases.remove("") {
            self.aliases.insert(alias.to_string(), table);
        }
        self.push_block(format!("AS {alias}"));
        self
    }

    fn join_with(
        mut self,
        join_type: JoinType,
        table: &'q TableDescriptor,
        alias: &str,
    ) -> Self {
        if !self.enter(BuildStep::Join, &[QueryKind::Select], true) {
            return self;
        }
        if let Some(err) = table.registration_error() {
            self.fail(err.clone().context(format!("table {}", table.name())));
            return self;
        }
        if !crate::schema::is_identifier(alias) {
            self.fail(WeaveError::Syntax(format!("{alias:?} is not a valid alias")));
            return self;
        }
        if self.aliases.contains_key(alias) {
            self.fail(WeaveError::Syntax(format!("alias {alias} is already in use")));
            return self;
        }
        self.aliases.insert(alias.to_string(), table);
        self.push_block(format!("{join_type} {} AS {alias}", table.name()));
        self
    }

    pub(crate) fn join_condition(mut self, field_a: &str, field_b: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        self.register([field_a, field_b]);
        self.extend_block(&format!(" ON {field_a} = {field_b}"));
        self
    }

    pub fn join(self, table: &'q TableDescriptor, alias: &str) -> JoinOn<'q> {
        JoinOn::new(self.join_with(JoinType::Join, table, alias))
    }

    pub fn inner_join(self, table: &'q TableDescriptor, alias: &str) -> JoinOn<'q> {
        JoinOn::new(self.join_with(JoinType::Inner, table, alias))
    }

    pub fn left_join(self, table: &'q TableDescriptor, alias: &str) -> JoinOn<'q> {
        JoinOn::new(self.join_with(JoinType::Left, table, alias))
    }

    pub fn right_join(self, table: &'q TableDescriptor, alias: &str) -> JoinOn<'q> {
        JoinOn::new(self.join_with(JoinType::Right, table, alias))
    }

    /// `CROSS JOIN` takes no `ON` condition.
    pub fn cross_join(self, table: &'q TableDescriptor, alias: &str) -> Self {
        self.join_with(JoinType::Cross, table, alias)
    }

    fn order(mut self, field: &str, direction: &str) -> Self {
        let continuing = self.step == BuildStep::Order;
        if !self.enter(BuildStep::Order, &[QueryKind::Select], true) {
            return self;
        }
        self.register([field]);
        if continuing {
            self.extend_block(&format!(", {field} {direction}"));
        } else {
            self.push_block(format!("ORDER BY {field} {direction}"));
        }
        self
    }

    pub fn order_ascending(self, field: &str) -> Self {
        self.order(field, "ASC")
    }

    pub fn order_descending(self, field: &str) -> Self {
        self.order(field, "DESC")
    }

    pub fn group_by(mut self, fields: &[&str]) -> Self {
        if !self.enter(BuildStep::GroupBy, &[QueryKind::Select], false) {
            return self;
        }
        if fields.is_empty() {
            self.fail(WeaveError::Empty("GROUP BY needs at least one field".to_string()));
            return self;
        }
        self.register(fields.iter().copied());
        self.push_block(format!("GROUP BY {}", fields.join(", ")));
        self
    }

    pub fn limit(mut self, amount: u64) -> Self {
        if self.enter(BuildStep::Limit, &[QueryKind::Select], false) {
            self.push_block(format!("LIMIT {amount}"));
        }
        self
    }

    pub fn offset(mut self, amount: u64) -> Self {
        if self.enter(BuildStep::Offset, &[QueryKind::Select], false) {
            self.push_block(format!("OFFSET {amount}"));
        }
        self
    }

    pub fn returning(mut self, fields: &[&str]) -> Self {
        if !self.enter(
            BuildStep::Returning,
            &[QueryKind::Insert, QueryKind::Update, QueryKind::Delete],
            false,
        ) {
            return self;
        }
        if fields.is_empty() {
            self.fail(WeaveError::Empty("RETURNING needs at least one field".to_string()));
            return self;
        }
        self.register(fields.iter().copied());
        self.push_block(format!("RETURNING {}", fields.join(", ")));
        self
    }

    //--------------------------------------------------------------------------
    // Row handling
    //--------------------------------------------------------------------------

    /// Consumes the returned rows. Without a scanner the query only executes.
    ///
    /// By default a scanner reporting no rows fails the query with `NotFound`.
    pub fn scanner<F>(mut self, scanner: F) -> Self
    where
        F: FnMut(&mut Rows) -> Result<bool> + 'q,
    {
        self.scanner = Some(Box::new(scanner));
        self
    }

    /// Fail with `Found` when the scanner reports rows, and accept no rows.
    pub fn throw_on_found(mut self) -> Self {
        self.throw_on_found = true;
        self
    }

    //--------------------------------------------------------------------------
    // Inspection and submission
    //--------------------------------------------------------------------------

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn table(&self) -> &'q TableDescriptor {
        self.table
    }

    pub fn error(&self) -> Option<&WeaveError> {
        self.error.as_ref()
    }

    /// Values in placeholder order: `params()[n - 1]` binds `$n`.
    pub fn params(&self) -> &[Value] {
        &self.values
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholder_index - 1
    }

    pub fn referenced_fields(&self) -> &[String] {
        &self.referenced_fields
    }

    pub fn to_sql(&self) -> String {
        let blocks: Vec<&str> = self.blocks.iter().map(|b| b.text.as_str()).collect();
        blocks.join(" ")
    }

    /// The clause category of each block, in emission order.
    pub fn steps(&self) -> Vec<BuildStep> {
        self.blocks.iter().map(|b| b.step).collect()
    }

    /// Returns the terminal error, or the first field reference that does not
    /// resolve to a column of its (possibly aliased) table.
    pub fn validate(&self) -> Result<()> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        self.referenced_fields
            .iter()
            .try_for_each(|field| self.resolve(field))
    }

    fn resolve(&self, field: &str) -> Result<()> {
        let field = field.trim();
        let (alias, column) = field.split_once('.').unwrap_or(("", field));
        let table = self.aliases.get(alias).ok_or_else(|| {
            if alias.is_empty() {
                WeaveError::Syntax(format!(
                    "field {field} needs an alias: the target table is aliased"
                ))
            } else {
                WeaveError::Syntax(format!("failed to resolve alias {alias} of field {field}"))
            }
        })?;
        if column == "*" {
            return Ok(());
        }
        match table.column(column) {
            Some(descriptor) if !descriptor.ignored => Ok(()),
            _ => Err(WeaveError::Syntax(format!(
                "field {column} does not exist in table {}",
                table.name()
            ))),
        }
    }

    /// Validates the query and hands over its text, values and scanner.
    pub fn into_statement(self) -> Result<Statement<'q>> {
        self.validate()?;
        debug_assert_eq!(self.values.len(), self.placeholder_index - 1);
        Ok(Statement {
            sql: self.to_sql(),
            params: self.values,
            scanner: self.scanner,
            throw_on_found: self.throw_on_found,
        })
    }
}

impl fmt::Debug for Query<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("kind", &self.kind)
            .field("table", &self.table.name())
            .field("sql", &self.to_sql())
            .field("params", &self.values)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
