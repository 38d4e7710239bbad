//! Typed row values.
//!
//! `Value` is the unit of data crossing the driver boundary in both
//! directions: operands in filters, binds on prepared statements, and
//! decoded result columns.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A typed value bound to or decoded from a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value (also carries numeric-string properties)
    Str(String),
    /// Structured value; encoded to text right before binding
    Struct(JsonValue),
}

/// One entity row. Keys are property names; the sorted iteration order of
/// the map is what the insert path groups sparse rows by.
pub type Row = BTreeMap<String, Value>;

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this value for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Struct(_) => "struct",
        }
    }

    /// Compare two values the way the engine would for an ordered
    /// comparison. Integers and floats compare numerically across each
    /// other; strings compare lexicographically. Mixed or non-orderable
    /// pairs return `None`.
    pub(crate) fn engine_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        Self::Struct(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Int(1).type_name(), "int");
        assert_eq!(Value::Float(1.5).type_name(), "float");
        assert_eq!(Value::Str("x".into()).type_name(), "string");
    }

    #[test]
    fn test_engine_cmp_numeric_cross_type() {
        assert_eq!(
            Value::Int(3).engine_cmp(&Value::Float(2.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Float(1.0).engine_cmp(&Value::Int(1)),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_engine_cmp_strings() {
        assert_eq!(
            Value::Str("a".into()).engine_cmp(&Value::Str("b".into())),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_engine_cmp_mixed_is_none() {
        assert_eq!(Value::Int(1).engine_cmp(&Value::Str("1".into())), None);
        assert_eq!(Value::Null.engine_cmp(&Value::Int(1)), None);
    }
}
