//! Value model and type coercion
//!
//! Every field handled by the store is a tagged [`Value`]. Coercion to and from
//! the stored representation is table-driven: [`to_storage`] picks the SQLite
//! value and a [`TypeTag`] naming the original kind, [`from_storage`] uses that
//! tag to rebuild an application value.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value as SqlValue;
use serde::Serialize;

/// Text form used for stored dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Text form used for stored datetimes; the fraction is always six digits
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Application-level value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Tag describing the kind of this value
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Null,
            Value::Boolean(_) => TypeTag::Boolean,
            Value::Integer(_) => TypeTag::Integer,
            Value::Real(_) => TypeTag::Real,
            Value::Text(_) => TypeTag::Text,
            Value::Blob(_) => TypeTag::Blob,
            Value::Date(_) => TypeTag::Date,
            Value::DateTime(_) => TypeTag::DateTime,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Boolean(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(b) => {
                write!(f, "x'")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                write!(f, "'")
            }
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Blob(v.to_vec())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Untagged conversion of whatever SQLite handed back
impl From<SqlValue> for Value {
    fn from(v: SqlValue) -> Self {
        match v {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(i) => Value::Integer(i),
            SqlValue::Real(f) => Value::Real(f),
            SqlValue::Text(s) => Value::Text(s),
            SqlValue::Blob(b) => Value::Blob(b),
        }
    }
}

/// JSON input: scalars map directly, arrays and objects are kept as JSON text
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map(Value::Real).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Text(other.to_string()),
        }
    }
}

/// Tag recording the original kind of a stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Null,
    Boolean,
    Integer,
    Real,
    Text,
    Blob,
    Date,
    DateTime,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::Boolean => "bool",
            TypeTag::Integer => "int",
            TypeTag::Real => "float",
            TypeTag::Text => "text",
            TypeTag::Blob => "bytes",
            TypeTag::Date => "date",
            TypeTag::DateTime => "datetime",
        }
    }

    /// Whether values of this kind are stored as text
    pub fn is_textual(&self) -> bool {
        matches!(self, TypeTag::Text | TypeTag::Date | TypeTag::DateTime)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "null" => Ok(TypeTag::Null),
            "bool" => Ok(TypeTag::Boolean),
            "int" => Ok(TypeTag::Integer),
            "float" => Ok(TypeTag::Real),
            "text" => Ok(TypeTag::Text),
            "bytes" => Ok(TypeTag::Blob),
            "date" => Ok(TypeTag::Date),
            "datetime" => Ok(TypeTag::DateTime),
            _ => Err(anyhow!("Unknown value type tag '{}'", s)),
        }
    }
}

/// Declared type of a column created from a first value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    Integer,
    Real,
    Text,
    Blob,
}

impl ColumnType {
    /// Infer the column type for a representative value; absent values default to text
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Boolean(_) => ColumnType::Boolean,
            Value::Integer(_) => ColumnType::Integer,
            Value::Real(_) => ColumnType::Real,
            Value::Blob(_) => ColumnType::Blob,
            Value::Null | Value::Text(_) | Value::Date(_) | Value::DateTime(_) => {
                ColumnType::Text
            }
        }
    }

    pub fn declaration(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Blob => "BLOB",
        }
    }
}

/// Coerce an application value into its stored representation
pub fn to_storage(value: &Value) -> (SqlValue, TypeTag) {
    let stored = match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(b) => SqlValue::Integer(*b as i64),
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
        Value::Date(d) => SqlValue::Text(d.format(DATE_FORMAT).to_string()),
        Value::DateTime(dt) => SqlValue::Text(dt.format(DATETIME_FORMAT).to_string()),
    };
    (stored, value.type_tag())
}

/// Rebuild an application value from its stored representation and tag
///
/// Booleans come back as integers 0/1 and dates as their text form.
/// Representation drift (an integer stored under a `float` tag, UTF-8 bytes
/// under a `text` tag) is reconciled towards the tagged kind.
pub fn from_storage(stored: SqlValue, tag: TypeTag) -> Value {
    match (tag, stored) {
        (_, SqlValue::Null) | (TypeTag::Null, _) => Value::Null,
        (TypeTag::Real, SqlValue::Integer(i)) => Value::Real(i as f64),
        (TypeTag::Integer | TypeTag::Boolean, SqlValue::Real(f)) if f.fract() == 0.0 => {
            Value::Integer(f as i64)
        }
        (t, SqlValue::Blob(b)) if t.is_textual() => match String::from_utf8(b) {
            Ok(s) => Value::Text(s),
            Err(e) => Value::Blob(e.into_bytes()),
        },
        (TypeTag::Blob, SqlValue::Text(s)) => Value::Blob(s.into_bytes()),
        (_, other) => Value::from(other),
    }
}
