//! Value model for event records.
//!
//! An event is a tree of [`Value`]s rooted at an object. The set of variants is
//! closed: every built-in function and operator handles each kind explicitly,
//! which is what lets the compiler reason about which operations can fail.

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use std::collections::BTreeMap;
use std::fmt;

pub mod json;
pub mod path;

pub use path::{FieldPath, PathError, Segment};

/// Key/value storage used for object values.
pub type ObjectMap = BTreeMap<String, Value>;

/// Represents a value inside an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An explicit null
    Null,
    /// A boolean value
    Boolean(bool),
    /// A 64-bit signed integer
    Integer(i64),
    /// A 64-bit floating point number
    Float(f64),
    /// A UTF-8 string
    String(String),
    /// A point in time, carrying the offset it was produced in
    Timestamp(DateTime<FixedOffset>),
    /// Raw bytes that are not known to be valid UTF-8
    Bytes(Bytes),
    /// An ordered sequence of values
    Array(Vec<Value>),
    /// A string-keyed map of values
    Object(ObjectMap),
}

/// The kind of a [`Value`], used in type errors and by `type_of`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Timestamp,
    Bytes,
    Array,
    Object,
}

impl Kind {
    /// Lower-case name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Boolean => "boolean",
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Timestamp => "timestamp",
            Kind::Bytes => "bytes",
            Kind::Array => "array",
            Kind::Object => "object",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Creates an empty object value.
    pub fn empty_object() -> Self {
        Value::Object(ObjectMap::new())
    }

    /// Returns the kind of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Boolean(_) => Kind::Boolean,
            Value::Integer(_) => Kind::Integer,
            Value::Float(_) => Kind::Float,
            Value::String(_) => Kind::String,
            Value::Timestamp(_) => Kind::Timestamp,
            Value::Bytes(_) => Kind::Bytes,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectMap> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectMap> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up the value at `path`. `None` means the location is absent,
    /// which is distinct from a present `Value::Null`.
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        path::get(self, path.segments())
    }

    /// Writes `value` at `path`, returning the previous value if one was present.
    ///
    /// Missing object parents are created. Index segments never extend an
    /// array: the array must exist and the index must be in range.
    pub fn insert(&mut self, path: &FieldPath, value: Value) -> Result<Option<Value>, PathError> {
        path::insert(self, path, value)
    }

    /// Removes the value at `path` and returns it. Removing from an array
    /// shifts the following elements down.
    pub fn remove(&mut self, path: &FieldPath) -> Option<Value> {
        path::remove(self, path)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{:?}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Timestamp(ts) => {
                write!(f, "t'{}'", ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Bytes(b) => write!(f, "{:?}", String::from_utf8_lossy(b)),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(map) => {
                write!(f, "{{ ")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", key, value)?;
                }
                write!(f, " }}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Value::Bytes(value)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Value::Timestamp(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<ObjectMap> for Value {
    fn from(value: ObjectMap) -> Self {
        Value::Object(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_numeric_coercion_in_equality() {
        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert_eq!(Value::Integer(1), Value::Integer(1));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Value::Null.kind().as_str(), "null");
        assert_eq!(Value::from("x").kind().to_string(), "string");
        assert_eq!(Value::empty_object().kind(), Kind::Object);
    }

    #[test]
    fn test_display_literal_form() {
        let mut map = ObjectMap::new();
        map.insert("a".to_string(), Value::Array(vec![Value::Integer(1), Value::Float(2.5)]));
        map.insert("b".to_string(), Value::from("hi"));
        assert_eq!(Value::Object(map).to_string(), r#"{ "a": [1, 2.5], "b": "hi" }"#);
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
    }
}
