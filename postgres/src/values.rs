//! Conversions between pgweave values and the postgres wire types

use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use pgweave_core::{Result, Value, WeaveError};
use postgres::Row;
use postgres::types::{FromSql, IsNull, Kind, ToSql, Type, to_sql_checked};

/// A borrowed [`Value`] bound to a statement parameter.
///
/// Integers and doubles are widened or narrowed to the parameter's declared
/// type, so `Value::Int` binds to a BIGINT column and `Value::BigInt` to an
/// INTEGER one when it fits.
#[derive(Debug)]
pub struct PgParam<'a>(pub &'a Value);

impl ToSql for PgParam<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql(ty, out),
            Value::Int(i) => integer_to_sql(i64::from(*i), ty, out),
            Value::BigInt(i) => integer_to_sql(*i, ty, out),
            Value::Double(f) if *ty == Type::FLOAT4 => (*f as f32).to_sql(ty, out),
            Value::Double(f) => f.to_sql(ty, out),
            // enum labels travel in text form
            Value::Text(s) => s.as_str().to_sql(ty, out),
            Value::Bytes(b) => b.as_slice().to_sql(ty, out),
            Value::Timestamp(ts) if *ty == Type::TIMESTAMP => ts.naive_utc().to_sql(ty, out),
            Value::Timestamp(ts) => ts.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn integer_to_sql(
    value: i64,
    ty: &Type,
    out: &mut BytesMut,
) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        Type::FLOAT8 => (value as f64).to_sql(ty, out),
        _ => value.to_sql(ty, out),
    }
}

/// Text read from text-like columns and enum columns alike.
struct Label(String);

impl<'a> FromSql<'a> for Label {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(Label(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(ty.kind(), Kind::Enum(_)) || <&str as FromSql>::accepts(ty)
    }
}

fn read<'a, T: FromSql<'a>>(row: &'a Row, index: usize) -> Result<Option<T>> {
    row.try_get::<_, Option<T>>(index)
        .map_err(|e| WeaveError::FailedOperation(e.to_string()))
}

/// Reads column `index` of `row` into a [`Value`] according to its declared type.
pub fn column_value(row: &Row, index: usize) -> Result<Value> {
    let ty = row.columns()[index].type_();
    let value = match *ty {
        Type::BOOL => read::<bool>(row, index)?.map(Value::Bool),
        Type::INT2 => read::<i16>(row, index)?.map(|i| Value::Int(i32::from(i))),
        Type::INT4 => read::<i32>(row, index)?.map(Value::Int),
        Type::INT8 => read::<i64>(row, index)?.map(Value::BigInt),
        Type::FLOAT4 => read::<f32>(row, index)?.map(|f| Value::Double(f64::from(f))),
        Type::FLOAT8 => read::<f64>(row, index)?.map(Value::Double),
        Type::BYTEA => read::<Vec<u8>>(row, index)?.map(Value::Bytes),
        Type::TIMESTAMPTZ => read::<DateTime<Utc>>(row, index)?.map(Value::Timestamp),
        Type::TIMESTAMP => {
            read::<NaiveDateTime>(row, index)?.map(|ts| Value::Timestamp(ts.and_utc()))
        }
        _ if Label::accepts(ty) => read::<Label>(row, index)?.map(|label| Value::Text(label.0)),
        _ => {
            return Err(WeaveError::FailedOperation(format!(
                "unsupported column type {} for column {}",
                ty.name(),
                row.columns()[index].name()
            )));
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Reads every column of `row`.
pub fn row_values(row: &Row) -> Result<Vec<Value>> {
    (0..row.len()).map(|index| column_value(row, index)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: Value, ty: Type) -> Vec<u8> {
        let mut out = BytesMut::new();
        let is_null = PgParam(&value).to_sql(&ty, &mut out).unwrap();
        assert!(matches!(is_null, IsNull::No));
        out.to_vec()
    }

    #[test]
    fn integers_follow_the_declared_type() {
        assert_eq!(encode(Value::Int(7), Type::INT8), 7i64.to_be_bytes());
        assert_eq!(encode(Value::BigInt(7), Type::INT4), 7i32.to_be_bytes());
        assert_eq!(encode(Value::Int(7), Type::INT2), 7i16.to_be_bytes());
    }

    #[test]
    fn narrowing_overflow_is_an_error() {
        let mut out = BytesMut::new();
        let value = Value::BigInt(i64::from(i32::MAX) + 1);
        assert!(PgParam(&value).to_sql(&Type::INT4, &mut out).is_err());
    }

    #[test]
    fn null_binds_as_null() {
        let mut out = BytesMut::new();
        let is_null = PgParam(&Value::Null).to_sql(&Type::TEXT, &mut out).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(out.is_empty());
    }

    #[test]
    fn text_is_sent_verbatim() {
        assert_eq!(encode(Value::from("admin"), Type::TEXT), b"admin");
    }
}
