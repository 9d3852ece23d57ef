//! Detachable WHERE-clause fragments
//!
//! A [`Condition`] is built before it is attached to a query, so it cannot
//! number its own placeholders. It keeps its values beside the text and the
//! owning query assigns `$n` indices when [`Query::r#where`](super::Query::r#where)
//! attaches it. Combining conditions copies their chunks, so the same
//! condition can be reused in several trees.

use crate::error::WeaveError;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
enum Chunk {
    Text(String),
    Param(Value),
}

/// A piece of WHERE-clause text with its own bound values and error channel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Condition {
    chunks: Vec<Chunk>,
    fields: Vec<String>,
    error: Option<WeaveError>,
}

impl Condition {
    fn on_field(name: &str) -> Self {
        Condition {
            chunks: vec![Chunk::Text(format!("{name} "))],
            fields: vec![name.to_string()],
            error: None,
        }
    }

    fn text(mut self, text: &str) -> Self {
        match self.chunks.last_mut() {
            Some(Chunk::Text(last)) => last.push_str(text),
            _ => self.chunks.push(Chunk::Text(text.to_string())),
        }
        self
    }

    fn param(mut self, value: Value) -> Self {
        self.chunks.push(Chunk::Param(value));
        self
    }

    fn fail(mut self, error: WeaveError) -> Self {
        self.error.get_or_insert(error);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn error(&self) -> Option<&WeaveError> {
        self.error.as_ref()
    }

    /// Field references to validate once the condition is attached.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Number of values the condition binds.
    pub fn param_count(&self) -> usize {
        self.chunks
            .iter()
            .filter(|chunk| matches!(chunk, Chunk::Param(_)))
            .count()
    }

    /// Writes the condition into `sql`, numbering placeholders from `next_index`.
    pub(crate) fn render_into(
        self,
        sql: &mut String,
        next_index: &mut usize,
        values: &mut Vec<Value>,
    ) {
        for chunk in self.chunks {
            match chunk {
                Chunk::Text(text) => sql.push_str(&text),
                Chunk::Param(value) => {
                    sql.push_str(&format!("${next_index}"));
                    *next_index += 1;
                    values.push(value);
                }
            }
        }
    }

    /// Renders with placeholders starting at `$1`.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut index = 1;
        let mut values = Vec::new();
        self.clone().render_into(&mut sql, &mut index, &mut values);
        (sql, values)
    }

    pub(crate) fn into_parts(self) -> (Self, Vec<String>, Option<WeaveError>) {
        let Condition {
            chunks,
            fields,
            error,
        } = self;
        (
            Condition {
                chunks,
                fields: Vec::new(),
                error: None,
            },
            fields,
            error,
        )
    }
}

/// A column about to be compared. Created with [`field`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
}

/// Starts a condition on `name`, which may be `alias.column`.
pub fn field(name: impl Into<String>) -> Field {
    Field { name: name.into() }
}

impl Field {
    fn compare(self, operator: &str, value: impl Into<Value>) -> Condition {
        Condition::on_field(&self.name)
            .text(operator)
            .text(" ")
            .param(value.into())
    }

    /// `= $n`, or `IS NULL` for a null value, which never binds.
    pub fn is_equal(self, value: impl Into<Value>) -> Condition {
        match value.into() {
            Value::Null => Condition::on_field(&self.name).text("IS NULL"),
            value => self.compare("=", value),
        }
    }

    pub fn is_null(self) -> Condition {
        self.is_equal(Value::Null)
    }

    /// `IN ($n, $n+1, ...)`. An empty list is a syntax error.
    pub fn is_any<I, V>(self, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let condition = Condition::on_field(&self.name);
        if values.is_empty() {
            return condition.fail(WeaveError::Syntax(format!(
                "IN list for {} is empty; drop the condition instead",
                self.name
            )));
        }

        let last = values.len() - 1;
        let mut condition = condition.text("IN (");
        for (i, value) in values.into_iter().enumerate() {
            condition = condition.param(value);
            if i < last {
                condition = condition.text(", ");
            }
        }
        condition.text(")")
    }

    /// `LIKE $n`, or `ILIKE $n` when not case sensitive. The pattern is bound.
    pub fn is_like(self, pattern: impl Into<String>, case_sensitive: bool) -> Condition {
        let operator = if case_sensitive { "LIKE" } else { "ILIKE" };
        self.compare(operator, Value::Text(pattern.into()))
    }

    /// `BETWEEN $n AND $n+1`
    pub fn is_in_range(self, low: impl Into<Value>, high: impl Into<Value>) -> Condition {
        Condition::on_field(&self.name)
            .text("BETWEEN ")
            .param(low.into())
            .text(" AND ")
            .param(high.into())
    }

    pub fn is_less_than(self, value: impl Into<Value>) -> Condition {
        self.compare("<", value)
    }

    pub fn is_greater_than(self, value: impl Into<Value>) -> Condition {
        self.compare(">", value)
    }

    pub fn is_before(self, value: impl Into<Value>) -> Condition {
        self.is_less_than(value)
    }

    pub fn is_after(self, value: impl Into<Value>) -> Condition {
        self.is_greater_than(value)
    }
}

fn combine<I>(conditions: I, operator: &str) -> Condition
where
    I: IntoIterator<Item = Condition>,
{
    let mut combined = Condition::default();
    for condition in conditions.into_iter().filter(|c| !c.is_empty()) {
        if !combined.is_empty() {
            combined = combined.text(operator);
        }
        let Condition {
            chunks,
            fields,
            error,
        } = condition;
        for chunk in chunks {
            combined = match chunk {
                Chunk::Text(text) => combined.text(&text),
                Chunk::Param(value) => combined.param(value),
            };
        }
        combined.fields.extend(fields);
        if let Some(error) = error {
            combined = combined.fail(error);
        }
    }
    combined
}

/// Joins the non-empty `conditions` with `AND`.
pub fn and<I>(conditions: I) -> Condition
where
    I: IntoIterator<Item = Condition>,
{
    combine(conditions, " AND ")
}

/// Joins the non-empty `conditions` with `OR`.
pub fn or<I>(conditions: I) -> Condition
where
    I: IntoIterator<Item = Condition>,
{
    combine(conditions, " OR ")
}

/// Parenthesizes `condition` so it nests as one operand.
pub fn compose(condition: Condition) -> Condition {
    if condition.is_empty() {
        return condition;
    }
    let mut composed = Condition {
        chunks: vec![Chunk::Text("(".to_string())],
        fields: Vec::new(),
        error: None,
    };
    composed = combine([composed, condition], "");
    composed.text(")")
}
