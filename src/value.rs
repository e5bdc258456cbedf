//! Dynamically typed setting values and their store encoding.

use bytes::Bytes;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stored form of a top-level NaN float.
const NAN_TEXT: &str = "NaN";

/// A setting value.
///
/// The cache treats values as opaque. In the store, integers, floats and
/// byte buffers use their native SQLite types; everything else is written as
/// JSON text.
///
/// SQLite has no REAL representation for NaN, so a top-level NaN float is
/// stored as the text `NaN`. Non-finite floats nested inside lists or maps
/// are not preserved: JSON writes them as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Bytes(Bytes),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Parse JSON text into a value.
    pub fn from_json(text: &str) -> Result<Value, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Decode TEXT read from the store. Text that is not JSON was written by
    /// something else and is kept verbatim.
    fn from_stored_text(text: &str) -> Value {
        if text == NAN_TEXT {
            return Value::Float(f64::NAN);
        }
        Value::from_json(text).unwrap_or_else(|_| Value::Text(text.to_string()))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "(binary data: {} bytes)", b.len()),
            Value::List(_) | Value::Map(_) => match serde_json::to_string(self) {
                Ok(json) => write!(f, "{}", json),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;

        let out = match self {
            Value::Int(i) => ToSqlOutput::Owned(Sql::Integer(*i)),
            Value::Float(f) if f.is_nan() => ToSqlOutput::Borrowed(ValueRef::Text(NAN_TEXT.as_bytes())),
            Value::Float(f) => ToSqlOutput::Owned(Sql::Real(*f)),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(&b[..])),
            other => {
                let json = serde_json::to_string(other)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                ToSqlOutput::Owned(Sql::Text(json))
            }
        };
        Ok(out)
    }
}

impl FromSql for Value {
    /// NULL is rejected here; read `Option<Value>` to treat it as absent.
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Err(FromSqlError::InvalidType),
            ValueRef::Integer(i) => Ok(Value::Int(i)),
            ValueRef::Real(f) => Ok(Value::Float(f)),
            ValueRef::Text(raw) => {
                let text = std::str::from_utf8(raw).map_err(|e| FromSqlError::Other(Box::new(e)))?;
                Ok(Value::from_stored_text(text))
            }
            ValueRef::Blob(raw) => Ok(Value::Bytes(Bytes::copy_from_slice(raw))),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(b))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items.into_iter().map(Value::Text).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn stored(value: &Value) -> Option<Value> {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (v)", []).unwrap();
        conn.execute("INSERT INTO t VALUES (?1)", [value]).unwrap();
        conn.query_row("SELECT v FROM t", [], |row| row.get::<_, Option<Value>>(0))
            .unwrap()
    }

    fn column_type(value: &Value) -> String {
        let conn = Connection::open_in_memory().unwrap();
        conn.query_row("SELECT typeof(?1)", [value], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_native_sql_types() {
        assert_eq!(column_type(&Value::Int(7)), "integer");
        assert_eq!(column_type(&Value::Float(0.5)), "real");
        assert_eq!(column_type(&Value::from(vec![1u8, 2])), "blob");
        assert_eq!(column_type(&Value::from("x")), "text");
        assert_eq!(column_type(&Value::Bool(true)), "text");
    }

    #[test]
    fn test_text_that_looks_numeric_stays_text() {
        let value = Value::from("123");
        assert_eq!(stored(&value), Some(value));
    }

    #[test]
    fn test_composite_values_survive_store() {
        let mut map = BTreeMap::new();
        map.insert("size".to_string(), Value::Int(12));
        map.insert("family".to_string(), Value::from("Mono"));
        let value = Value::List(vec![Value::Map(map), Value::Bool(false), Value::Float(1.5)]);
        assert_eq!(stored(&value), Some(value));
    }

    #[test]
    fn test_nan_survives_store() {
        assert!(matches!(stored(&Value::Float(f64::NAN)), Some(Value::Float(f)) if f.is_nan()));
        assert_eq!(stored(&Value::Float(f64::INFINITY)), Some(Value::Float(f64::INFINITY)));

        // A quoted "NaN" is ordinary text.
        assert_eq!(stored(&Value::from("NaN")), Some(Value::from("NaN")));
    }

    #[test]
    fn test_foreign_text_and_null() {
        let conn = Connection::open_in_memory().unwrap();
        let raw: Option<Value> = conn
            .query_row("SELECT 'plain words'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(raw, Some(Value::from("plain words")));

        let null: Option<Value> = conn.query_row("SELECT NULL", [], |row| row.get(0)).unwrap();
        assert_eq!(null, None);
    }

    #[test]
    fn test_accessors_and_display() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::from("a").as_str(), Some("a"));
        assert_eq!(Value::Bool(true).as_i64(), None);
        assert_eq!(Value::from(vec!["a".to_string()]).to_string(), r#"["a"]"#);
        assert_eq!(Value::from(vec![0u8; 4]).to_string(), "(binary data: 4 bytes)");
    }
}
