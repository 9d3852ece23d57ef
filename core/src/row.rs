//! Rows returned by an executor and handed to row scanners

use crate::error::{Result, WeaveError};
use crate::value::{FromValue, Value};
use std::collections::VecDeque;
use std::sync::Arc;

/// A single result row. Column names are shared between rows of one result.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Reads the value at `index` as `T`.
    pub fn get<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self.values.get(index).ok_or_else(|| {
            WeaveError::NotFound(format!(
                "column index {index} out of range for a row of {}",
                self.values.len()
            ))
        })?;
        T::from_value(value)
    }

    /// Reads the column called `name` as `T`.
    pub fn get_by_name<T: FromValue>(&self, name: &str) -> Result<T> {
        let index = self
            .columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| WeaveError::NotFound(format!("column {name} is not in the row")))?;
        self.get(index)
    }
}

/// Cursor over the rows of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    columns: Arc<[String]>,
    rows: VecDeque<Row>,
}

impl Rows {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns: columns.into(),
            rows: VecDeque::new(),
        }
    }

    /// Appends a row; values are matched to columns by position.
    pub fn push(&mut self, values: Vec<Value>) {
        self.rows.push_back(Row::new(self.columns.clone(), values));
    }

    pub fn with_row(mut self, values: Vec<Value>) -> Self {
        self.push(values);
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Advances the cursor.
    pub fn next_row(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }
}

impl Iterator for Rows {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.next_row()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_reads_by_index_and_name() {
        let mut rows = Rows::new(vec!["id".into(), "name".into()])
            .with_row(vec![Value::Int(1), Value::from("alice")])
            .with_row(vec![Value::Int(2), Value::Null]);

        assert_eq!(rows.remaining(), 2);
        let first = rows.next_row().unwrap();
        assert_eq!(first.get::<i32>(0).unwrap(), 1);
        assert_eq!(first.get_by_name::<String>("name").unwrap(), "alice");

        let second = rows.next_row().unwrap();
        assert_eq!(second.get_by_name::<Option<String>>("name").unwrap(), None);
        assert!(second.get_by_name::<i32>("missing").is_err());
        assert!(rows.next_row().is_none());
    }
}
