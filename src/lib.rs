//! # wdl-frontend
//!
//! Semantic front end for the Workflow Description Language (WDL), version 1.1.
//!
//! A document is parsed into a position-indexed tree ([`tree`]) with a lexical
//! scope chain ([`scope`]). Expressions are compiled to Reverse Polish Notation
//! ([`expr`]) and can be evaluated against any [`Environment`], including the
//! document's own scopes.
//!
//! ```
//! use wdl_frontend::parser::parse_source;
//!
//! let parsed = parse_source("version 1.1\nworkflow hello { Int n = 1 + 2 }", "hello.wdl");
//! assert!(parsed.is_clean());
//! let workflow = parsed.document.workflow.unwrap();
//! assert_eq!(workflow.private_decls[0].identifier, "n");
//! ```

pub mod config;
pub mod env;
pub mod error;
pub mod expr;
pub mod listener;
pub mod parser;
pub mod scope;
pub mod tree;
pub mod types;
pub mod value;

pub use config::{Config, OutputFormat, ParseOptions};
pub use env::{Binding, Bindings, Environment};
pub use error::{ErrorKind, MultiErrorContext, SourcePosition, SyntaxError, WdlError};
pub use expr::{evaluate, Expression, Operator, RpnItem, ScopeEnvironment};
pub use listener::AstBuilder;
pub use parser::{parse, parse_file, parse_source, parse_with_options, ParsedDocument};
pub use scope::{ScopeId, ScopeTree, Symbol, SymbolKind};
pub use tree::{
    Call, Decl, Document, Import, KeyValue, NodeId, NodeKind, Span, StructDef, Task, Workflow,
    WorkflowSection,
};
pub use types::Type;
pub use value::Value;
