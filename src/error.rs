//! Error types and source position tracking for WDL parsing and evaluation.
//!
//! Parse-time problems are collected rather than raised: the parser returns a
//! best-effort tree alongside every error it saw. Evaluation errors short-circuit
//! and are returned to the caller of the evaluator.

use crate::tree::NodeKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Source position information for AST nodes and errors.
///
/// Lines are one-based and columns are zero-based, counted in characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    /// The filename or URI the source was loaded from (may be empty)
    pub uri: String,
    /// One-based line number where the construct starts
    pub line: u32,
    /// Zero-based column number where the construct starts
    pub column: u32,
    /// One-based line number where the construct ends
    pub end_line: u32,
    /// Zero-based column number where the construct ends
    pub end_column: u32,
}

impl SourcePosition {
    pub fn new(uri: String, line: u32, column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            uri,
            line,
            column,
            end_line,
            end_column,
        }
    }

    /// A position for errors raised without any source context.
    pub fn unknown() -> Self {
        Self::new(String::new(), 0, 0, 0, 0)
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A syntax error reported by the grammar walker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxError {
    /// One-based line of the offending token
    pub line: u32,
    /// Zero-based column of the offending token
    pub column: u32,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}:{} \"{}\"", self.line, self.column, self.message)
    }
}

/// Short names of the error taxonomy, as shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Syntax,
    KindMismatch,
    Redefinition,
    EmptyName,
    MismatchContext,
    TypeMismatch,
    Arithmetic,
    Unresolved,
    MalformedExpression,
    Unsupported,
    Io,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Syntax => "syntax",
            ErrorKind::KindMismatch => "kind-mismatch",
            ErrorKind::Redefinition => "redefinition",
            ErrorKind::EmptyName => "empty-name",
            ErrorKind::MismatchContext => "mismatch-context",
            ErrorKind::TypeMismatch => "type-mismatch",
            ErrorKind::Arithmetic => "arithmetic",
            ErrorKind::Unresolved => "unresolved",
            ErrorKind::MalformedExpression => "malformed-expression",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Io => "io",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

/// Main error type for all WDL-related errors.
#[derive(Error, Debug)]
pub enum WdlError {
    /// Failure to lex/parse a WDL document
    #[error("line {}:{} \"{message}\"", pos.line, pos.column)]
    Syntax { pos: SourcePosition, message: String },

    /// An AST child offered to a parent that cannot hold it
    #[error("{child} cannot be attached to {parent}")]
    KindMismatch {
        pos: SourcePosition,
        parent: NodeKind,
        child: NodeKind,
    },

    /// A name defined twice within one scope or one key-value block
    #[error("redefinition of `{name}`; the first definition is kept")]
    Redefinition { pos: SourcePosition, name: String },

    /// A symbol definition without a name
    #[error("cannot define a symbol with an empty name")]
    EmptyName { pos: SourcePosition },

    /// An exit event that does not close the listener's open section
    #[error("exit of {found} does not match the open {expected}")]
    MismatchContext {
        pos: SourcePosition,
        expected: String,
        found: String,
    },

    /// Operand types not accepted by an operator
    #[error("type mismatch: {message}")]
    TypeMismatch { message: String },

    /// Integer division or remainder by zero
    #[error("arithmetic error: {message}")]
    Arithmetic { message: String },

    /// Identifier with no binding in the environment
    #[error("unresolved identifier `{name}`")]
    Unresolved { name: String },

    /// An RPN stream that does not reduce to exactly one value
    #[error("malformed expression: {message}")]
    MalformedExpression { message: String },

    /// An expression form the evaluator does not implement
    #[error("unsupported expression `{text}`")]
    Unsupported { text: String },

    /// Failure to read a source file
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failure to load the configuration file
    #[error("invalid configuration {path}: {message}")]
    Config { path: String, message: String },
}

impl WdlError {
    /// Get the source position for this error, if available.
    pub fn source_position(&self) -> Option<&SourcePosition> {
        match self {
            WdlError::Syntax { pos, .. } => Some(pos),
            WdlError::KindMismatch { pos, .. } => Some(pos),
            WdlError::Redefinition { pos, .. } => Some(pos),
            WdlError::EmptyName { pos } => Some(pos),
            WdlError::MismatchContext { pos, .. } => Some(pos),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WdlError::Syntax { .. } => ErrorKind::Syntax,
            WdlError::KindMismatch { .. } => ErrorKind::KindMismatch,
            WdlError::Redefinition { .. } => ErrorKind::Redefinition,
            WdlError::EmptyName { .. } => ErrorKind::EmptyName,
            WdlError::MismatchContext { .. } => ErrorKind::MismatchContext,
            WdlError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            WdlError::Arithmetic { .. } => ErrorKind::Arithmetic,
            WdlError::Unresolved { .. } => ErrorKind::Unresolved,
            WdlError::MalformedExpression { .. } => ErrorKind::MalformedExpression,
            WdlError::Unsupported { .. } => ErrorKind::Unsupported,
            WdlError::Io { .. } => ErrorKind::Io,
            WdlError::Config { .. } => ErrorKind::Config,
        }
    }

    /// Create a syntax error.
    pub fn syntax_error(pos: SourcePosition, message: impl Into<String>) -> Self {
        WdlError::Syntax {
            pos,
            message: message.into(),
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        WdlError::TypeMismatch {
            message: message.into(),
        }
    }

    pub fn arithmetic(message: impl Into<String>) -> Self {
        WdlError::Arithmetic {
            message: message.into(),
        }
    }

    pub fn unresolved(name: impl Into<String>) -> Self {
        WdlError::Unresolved { name: name.into() }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        WdlError::MalformedExpression {
            message: message.into(),
        }
    }

    /// The walker-facing record for a syntax error; `None` for other kinds.
    pub fn to_syntax_error(&self) -> Option<SyntaxError> {
        match self {
            WdlError::Syntax { pos, message } => Some(SyntaxError {
                line: pos.line,
                column: pos.column,
                message: message.clone(),
            }),
            _ => None,
        }
    }
}

/// Context for collecting multiple errors.
///
/// This allows parsing to continue after encountering errors,
/// collecting them all before reporting.
#[derive(Debug, Default)]
pub struct MultiErrorContext {
    exceptions: Vec<WdlError>,
}

impl MultiErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to execute a closure, capturing any WdlError that occurs.
    /// Returns the result if successful, None if an error was captured.
    pub fn try_with<T, F>(&mut self, f: F) -> Option<T>
    where
        F: FnOnce() -> Result<T, WdlError>,
    {
        match f() {
            Ok(result) => Some(result),
            Err(error) => {
                self.append(error);
                None
            }
        }
    }

    /// Manually append an error to the collection.
    pub fn append(&mut self, error: WdlError) {
        log::warn!("{}: {}", error.kind(), error);
        self.exceptions.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.exceptions.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.exceptions.len()
    }

    pub fn errors(&self) -> &[WdlError] {
        &self.exceptions
    }

    /// Consume the context, returning the collected errors sorted by position.
    pub fn into_errors(mut self) -> Vec<WdlError> {
        self.exceptions
            .sort_by(|a, b| match (a.source_position(), b.source_position()) {
                (Some(pos_a), Some(pos_b)) => pos_a.cmp(pos_b),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
        self.exceptions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: u32, column: u32) -> SourcePosition {
        SourcePosition::new("test.wdl".to_string(), line, column, line, column + 4)
    }

    #[test]
    fn test_source_position_ordering() {
        let pos1 = pos(1, 0);
        let pos2 = pos(1, 6);
        let pos3 = pos(2, 0);

        assert!(pos1 < pos2);
        assert!(pos2 < pos3);
        assert!(pos1 < pos3);
    }

    #[test]
    fn test_syntax_error_display() {
        let error = WdlError::syntax_error(pos(3, 7), "unexpected token");
        assert_eq!(error.to_string(), "line 3:7 \"unexpected token\"");

        let record = error.to_syntax_error().unwrap();
        assert_eq!(record.line, 3);
        assert_eq!(record.column, 7);
        assert_eq!(record.to_string(), "line 3:7 \"unexpected token\"");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(WdlError::arithmetic("div by zero").kind(), ErrorKind::Arithmetic);
        assert_eq!(WdlError::unresolved("x").kind().to_string(), "unresolved");
        let err = WdlError::KindMismatch {
            pos: pos(1, 0),
            parent: NodeKind::Call,
            child: NodeKind::Task,
        };
        assert_eq!(err.kind().to_string(), "kind-mismatch");
        assert_eq!(err.to_string(), "task cannot be attached to call");
        assert!(err.to_syntax_error().is_none());
    }

    #[test]
    fn test_multi_error_context() {
        let mut ctx = MultiErrorContext::new();
        assert!(!ctx.has_errors());

        ctx.append(WdlError::Redefinition {
            pos: pos(2, 0),
            name: "b".to_string(),
        });
        let captured: Option<()> = ctx.try_with(|| {
            Err(WdlError::Redefinition {
                pos: pos(1, 0),
                name: "a".to_string(),
            })
        });
        assert!(captured.is_none());
        assert_eq!(ctx.error_count(), 2);

        let errors = ctx.into_errors();
        assert!(matches!(&errors[0], WdlError::Redefinition { name, .. } if name == "a"));
        assert!(matches!(&errors[1], WdlError::Redefinition { name, .. } if name == "b"));
    }
}
