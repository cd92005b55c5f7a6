//! WDL 1.1 parser.
//!
//! The grammar functions walk a token stream and emit parse-tree events; the
//! [`AstBuilder`](crate::listener::AstBuilder) turns those events into a
//! [`Document`]. Syntax errors are collected and the walk resumes at the next
//! element boundary, so every parse yields a (possibly partial) document.

pub mod command_parser;
pub mod declarations;
pub mod document;
pub mod events;
pub mod expressions;
pub mod keywords;
pub mod lexer;
pub mod literals;
pub mod parser_utils;
pub mod statements;
pub mod tasks;
pub mod token_stream;
pub mod tokens;
pub mod types;

use crate::config::ParseOptions;
use crate::error::{SyntaxError, WdlError};
use crate::listener::AstBuilder;
use crate::tree::Document;
use events::Walker;
use std::fs;
use std::path::Path;

pub use document::SUPPORTED_VERSION;

/// Everything one parse produced.
#[derive(Debug)]
pub struct ParsedDocument {
    pub document: Document,
    /// Walker errors, in source order
    pub syntax_errors: Vec<SyntaxError>,
    /// Semantic errors found while building the tree, sorted by position
    pub diagnostics: Vec<WdlError>,
    /// Syntax errors dropped past `max_syntax_errors`
    pub suppressed: usize,
}

impl ParsedDocument {
    /// No syntax errors were seen, recorded or not.
    pub fn is_clean(&self) -> bool {
        self.syntax_errors.is_empty() && self.suppressed == 0
    }
}

/// Parse source text with the given options; `path` labels positions.
pub fn parse_with_options(source: &str, path: &str, options: &ParseOptions) -> ParsedDocument {
    log::debug!("parsing {} ({} bytes)", path, source.len());
    let mut builder = AstBuilder::new(source, path, options.clone());
    let (syntax_errors, suppressed) = {
        let mut walker =
            Walker::new(source, path, &mut builder).with_max_errors(options.max_syntax_errors);
        document::parse_document(&mut walker);
        walker.finish()
    };
    let (document, diagnostics) = builder.finish();
    log::debug!(
        "parsed {}: {} syntax error(s), {} diagnostic(s)",
        path,
        syntax_errors.len() + suppressed,
        diagnostics.len()
    );
    ParsedDocument {
        document,
        syntax_errors,
        diagnostics,
        suppressed,
    }
}

/// Parse source text with default options.
pub fn parse_source(source: &str, path: &str) -> ParsedDocument {
    parse_with_options(source, path, &ParseOptions::default())
}

/// Read and parse a file.
pub fn parse_file(path: &Path, options: &ParseOptions) -> Result<ParsedDocument, WdlError> {
    let source = fs::read_to_string(path).map_err(|source| WdlError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_with_options(&source, &path.display().to_string(), options))
}

/// Parse a file path or, when `path_or_source` names no readable file, the text itself.
pub fn parse(path_or_source: &str) -> (Document, Vec<SyntaxError>) {
    let is_path = !path_or_source.contains('\n') && Path::new(path_or_source).is_file();
    let parsed = if is_path {
        match parse_file(Path::new(path_or_source), &ParseOptions::default()) {
            Ok(parsed) => parsed,
            Err(err) => {
                log::warn!("{}; parsing the argument as source", err);
                parse_source(path_or_source, "")
            }
        }
    } else {
        parse_source(path_or_source, "")
    };
    (parsed.document, parsed.syntax_errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_text() {
        let (doc, errors) = parse("version 1.1 workflow T {}");
        assert!(errors.is_empty());
        assert_eq!(doc.workflow.unwrap().name, "T");
        assert!(doc.tasks.is_empty());
        assert!(doc.imports.is_empty());
    }

    #[test]
    fn test_error_limit_counts_suppressed() {
        let source = "version 1.1\n? ? ?\ntask a { ! }\ntask b { ! }\ntask c { ! }";
        let options = ParseOptions {
            max_syntax_errors: Some(1),
            ..ParseOptions::default()
        };
        let parsed = parse_with_options(source, "t.wdl", &options);
        assert_eq!(parsed.syntax_errors.len(), 1);
        assert!(parsed.suppressed >= 1);
        assert!(!parsed.is_clean());
        assert_eq!(parsed.document.tasks.len(), 3);
    }

    #[test]
    fn test_parse_file_missing() {
        let err =
            parse_file(Path::new("/nonexistent/x.wdl"), &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, WdlError::Io { .. }));
    }
}
