//! WDL primitive types
//!
//! Only the atomic types take part in expression evaluation: `Boolean`, `Int`,
//! `Float`, `String`, and `File`, plus the symbolic `Any` carried by the `None`
//! literal. Declared types of compound shape (`Array[File]`, `Map[String,Int]`)
//! are kept as surface text on declarations and never reach the evaluator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The type tag of a [`Value`](crate::value::Value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Boolean,
    Int,
    Float,
    String,
    File,
    /// A symbolic type carried by `None`; no operator accepts it
    Any,
}

impl Type {
    /// Int and Float
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// String and File, whose payload is text
    pub fn is_textual(&self) -> bool {
        matches!(self, Type::String | Type::File)
    }

    /// Look up a primitive type by its WDL spelling.
    pub fn from_name(name: &str) -> Option<Type> {
        match name {
            "Boolean" => Some(Type::Boolean),
            "Int" => Some(Type::Int),
            "Float" => Some(Type::Float),
            "String" => Some(Type::String),
            "File" => Some(Type::File),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Boolean => "Boolean",
            Type::Int => "Int",
            Type::Float => "Float",
            Type::String => "String",
            Type::File => "File",
            Type::Any => "Any",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_round_trip() {
        for ty in [Type::Boolean, Type::Int, Type::Float, Type::String, Type::File] {
            assert_eq!(Type::from_name(&ty.to_string()), Some(ty));
        }
        assert_eq!(Type::from_name("Any"), None);
        assert_eq!(Type::from_name("Array"), None);
    }

    #[test]
    fn test_type_classes() {
        assert!(Type::Int.is_numeric());
        assert!(Type::Float.is_numeric());
        assert!(!Type::String.is_numeric());
        assert!(Type::File.is_textual());
        assert!(!Type::Any.is_textual());
    }
}
