//! Owned parameter and column values

use crate::error::{Result, WeaveError};
use chrono::{DateTime, Utc};
use core::fmt;

/// A value bound to a placeholder or read back from a row.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// SQL NULL
    #[default]
    Null,
    /// BOOLEAN values
    Bool(bool),
    /// INTEGER values (32-bit signed integer)
    Int(i32),
    /// BIGINT values (64-bit signed integer)
    BigInt(i64),
    /// DOUBLE PRECISION values
    Double(f64),
    /// TEXT, VARCHAR and enum labels
    Text(String),
    /// BYTEA values
    Bytes(Vec<u8>),
    /// TIMESTAMPTZ values
    Timestamp(DateTime<Utc>),
}

/// Discriminant of a [`Value`], used for homogeneity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Integer,
    Double,
    Text,
    Bytes,
    Timestamp,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Integer => "integer",
            ValueKind::Double => "double",
            ValueKind::Text => "text",
            ValueKind::Bytes => "bytes",
            ValueKind::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Int and BigInt share the `Integer` kind.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) | Value::BigInt(_) => ValueKind::Integer,
            Value::Double(_) => ValueKind::Double,
            Value::Text(_) => ValueKind::Text,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    /// Scalars are the values that can label an enumeration.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self.kind(),
            ValueKind::Bool | ValueKind::Integer | ValueKind::Double | ValueKind::Text
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text form used when a value is rendered into DDL (enum labels).
    pub fn to_label(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::BigInt(i) => Some(i.to_string()),
            Value::Double(d) => Some(d.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Null | Value::Bytes(_) | Value::Timestamp(_) => None,
        }
    }
}

//------------------------------------------------------------------------------
// Conversions into Value
//------------------------------------------------------------------------------

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value.into())
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => Bool,
    i16 => Int,
    i32 => Int,
    i64 => BigInt,
    f32 => Double,
    f64 => Double,
    String => Text,
    Vec<u8> => Bytes,
    DateTime<Utc> => Timestamp,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Text(value.clone())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

//------------------------------------------------------------------------------
// Conversions out of Value
//------------------------------------------------------------------------------

/// Extracts a Rust value from a column [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch(expected: &str, value: &Value) -> WeaveError {
    WeaveError::InvalidType(format!("expected {expected}, found {}", value.kind()))
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(*i),
            Value::BigInt(i) => i32::try_from(*i)
                .map_err(|_| WeaveError::InvalidType(format!("{i} does not fit in i32"))),
            other => Err(mismatch("i32", other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(i64::from(*i)),
            Value::BigInt(i) => Ok(*i),
            other => Err(mismatch("i64", other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Double(d) => Ok(*d),
            Value::Int(i) => Ok(f64::from(*i)),
            other => Err(mismatch("f64", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            other => Err(mismatch("text", other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            other => Err(mismatch("bytes", other)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Timestamp(ts) => Ok(*ts),
            other => Err(mismatch("timestamp", other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_none_becomes_null() {
        let value: Value = Option::<i32>::None.into();
        assert!(value.is_null());
        assert_eq!(Value::from(Some("a")), Value::Text("a".into()));
    }

    #[test]
    fn integer_widths_share_a_kind() {
        assert_eq!(Value::from(1i32).kind(), Value::from(1i64).kind());
        assert!(Value::from(3i64).is_scalar());
        assert!(!Value::Null.is_scalar());
        assert!(!Value::Bytes(vec![1]).is_scalar());
    }

    #[test]
    fn from_value_narrows_and_rejects() {
        assert_eq!(i32::from_value(&Value::BigInt(7)).unwrap(), 7);
        assert!(i32::from_value(&Value::BigInt(i64::MAX)).is_err());
        assert!(String::from_value(&Value::Int(1)).is_err());
        assert_eq!(Option::<String>::from_value(&Value::Null).unwrap(), None);
    }
}
