//! WDL values produced by literals and by expression evaluation
//!
//! Each value is a tagged variant whose payload matches its [`Type`]:
//! `bool`, `i64`, `f64`, or a string (for both `String` and `File`). The `None`
//! literal is the only value of type `Any`.

use crate::types::Type;
use serde::{Deserialize, Serialize};
use std::fmt;

/// WDL primitive value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// A path; the payload is the path as written
    File(String),
    /// The `None` literal
    None,
}

impl Value {
    pub fn boolean(value: bool) -> Self {
        Value::Boolean(value)
    }

    pub fn int(value: i64) -> Self {
        Value::Int(value)
    }

    pub fn float(value: f64) -> Self {
        Value::Float(value)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value::String(value.into())
    }

    pub fn file(value: impl Into<String>) -> Self {
        Value::File(value.into())
    }

    /// Get the WDL type of this value
    pub fn wdl_type(&self) -> Type {
        match self {
            Value::Boolean(_) => Type::Boolean,
            Value::Int(_) => Type::Int,
            Value::Float(_) => Type::Float,
            Value::String(_) => Type::String,
            Value::File(_) => Type::File,
            Value::None => Type::Any,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric payload, promoting `Int` to `Float`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Text payload of a `String` or `File`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::File(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value the way string interpolation does.
    ///
    /// Integers are written in base 10, floats in their shortest round-trip
    /// form, and `None` as the empty string.
    pub fn render(&self) -> String {
        match self {
            Value::Boolean(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::String(s) | Value::File(s) => s.clone(),
            Value::None => String::new(),
        }
    }

    /// Convert to JSON representation
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) | Value::File(s) => serde_json::Value::String(s.clone()),
            Value::None => serde_json::Value::Null,
        }
    }
}

/// Shortest round-trip text of a float; integral values keep a trailing `.0`.
pub fn format_float(value: f64) -> String {
    format!("{:?}", value)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::File(s) => write!(f, "File(\"{}\")", s),
            Value::None => f.write_str("None"),
            other => f.write_str(&other.render()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        assert_eq!(Value::boolean(true).wdl_type(), Type::Boolean);
        assert_eq!(Value::int(42).wdl_type(), Type::Int);
        assert_eq!(Value::float(1.5).wdl_type(), Type::Float);
        assert_eq!(Value::string("a").wdl_type(), Type::String);
        assert_eq!(Value::file("/tmp/x").wdl_type(), Type::File);
        assert_eq!(Value::None.wdl_type(), Type::Any);
    }

    #[test]
    fn test_render() {
        assert_eq!(Value::int(-12).render(), "-12");
        assert_eq!(Value::float(7.0).render(), "7.0");
        assert_eq!(Value::float(0.1).render(), "0.1");
        assert_eq!(Value::boolean(false).render(), "false");
        assert_eq!(Value::file("a/b.txt").render(), "a/b.txt");
        assert_eq!(Value::None.render(), "");
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::int(3).as_float(), Some(3.0));
        assert_eq!(Value::string("x").as_int(), None);
        assert_eq!(Value::file("f").as_str(), Some("f"));
        assert_eq!(Value::boolean(true).as_bool(), Some(true));
    }

    #[test]
    fn test_display_and_json() {
        assert_eq!(Value::string("hi").to_string(), "\"hi\"");
        assert_eq!(Value::None.to_string(), "None");
        assert_eq!(Value::int(2).to_json(), serde_json::json!(2));
        assert_eq!(Value::float(f64::NAN).to_json(), serde_json::Value::Null);
    }
}
