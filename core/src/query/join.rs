use super::Query;
use core::fmt;

/// The type of JOIN operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Join,
    Inner,
    Left,
    Right,
    Cross,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            JoinType::Join => "JOIN",
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Cross => "CROSS JOIN",
        };
        f.write_str(keyword)
    }
}

/// A join waiting for its `ON` condition.
#[must_use = "a join without ON is not part of the query"]
pub struct JoinOn<'q> {
    query: Query<'q>,
}

impl<'q> JoinOn<'q> {
    pub(super) fn new(query: Query<'q>) -> Self {
        Self { query }
    }

    /// Emits `ON field_a = field_b`; both fields are validated at submission.
    pub fn on(self, field_a: &str, field_b: &str) -> Query<'q> {
        self.query.join_condition(field_a, field_b)
    }
}
