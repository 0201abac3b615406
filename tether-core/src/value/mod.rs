//! Tagged Value Representation
//!
//! Reactive cells hold values from a small dynamic universe: null, booleans,
//! numbers, strings, ordered sequences, and string-keyed mappings. Instead of
//! introspecting runtime types, the category is decided once at construction
//! time and carried as an enum tag. Change detection and serialization both
//! dispatch on the tag.
//!
//! # Categories
//!
//! - `Null`, `Bool`, `Int`, `Float`, `Str`: scalar values, compared by
//!   equality.
//! - `Seq`, `Map`: composite values. Mappings preserve insertion order (the
//!   serializer emits entries in that order).
//! - `Verbatim`: pre-stringified content, passed through the serializer
//!   untouched. Used by the bootstrap layer to splice expressions into
//!   generated code.
//!
//! # Interop
//!
//! Values arriving from the server layer are JSON; `From<serde_json::Value>`
//! converts losslessly (`serde_json` is built with `preserve_order`, so
//! mapping order survives). `Value` also implements `serde::Serialize` with
//! the natural JSON mapping.

mod literal;
mod strings;

pub use literal::to_literal;
pub use strings::{parse_first_string, parse_string, str_repr};

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A value held by a reactive cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The null value.
    Null,

    /// A boolean.
    Bool(bool),

    /// An integer.
    Int(i64),

    /// A floating-point number.
    Float(f64),

    /// A string.
    Str(String),

    /// An ordered sequence. Composite: always treated as changed by the
    /// cell change-detection policy.
    Seq(Vec<Value>),

    /// A string-keyed mapping in insertion order. Composite, like `Seq`.
    Map(IndexMap<String, Value>),

    /// Pre-stringified content, serialized as-is.
    Verbatim(String),
}

impl Value {
    /// Whether this value is a composite (sequence or mapping).
    ///
    /// Composite values are always treated as changed by the cell set
    /// operation, even when equal to the stored value: their contents may
    /// have been mutated in place without the cell seeing it. False
    /// positives are acceptable there; false negatives are not.
    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Seq(_) | Value::Map(_))
    }

    /// Short category name, for diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Seq(_) => "seq",
            Value::Map(_) => "map",
            Value::Verbatim(_) => "verbatim",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Seq(value)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::Seq(iter.into_iter().collect())
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::Seq(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(key, val)| (key, Value::from(val)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::Str(s) | Value::Verbatim(s) => serializer.serialize_str(s),
            Value::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, val) in entries {
                    map.serialize_entry(key, val)?;
                }
                map.end()
            }
        }
    }
}
