//! Token-based document parsing for WDL (top-level parser)

use super::declarations::{parse_declaration, Initializer};
use super::events::{Production, Walker};
use super::literals::parse_plain_string;
use super::parser_utils::{
    expect_keyword, parse_block_body, parse_identifier, synchronize_document, ParseResult,
};
use super::tasks::{parse_task, parse_workflow};
use super::tokens::Token;
use crate::error::WdlError;

/// The only WDL version this front end accepts
pub const SUPPORTED_VERSION: &str = "1.1";

/// Parse a version declaration: version 1.1
fn parse_version(walker: &mut Walker) -> ParseResult<()> {
    let start = expect_keyword(&mut walker.stream, "version")?.start;
    let token = walker.stream.peek().clone();
    match token.token {
        Token::FloatLiteral(_) | Token::IntLiteral(_) | Token::Identifier(_) => {
            walker.stream.next();
        }
        _ => return Err(walker.stream.unexpected("version number")),
    }
    let text = walker.stream.text(token.start, token.end).to_string();
    walker.leaf(Production::Version { text: text.clone() }, start);

    if text != SUPPORTED_VERSION {
        let pos = walker.stream.byte_position(token.start, token.end);
        return Err(WdlError::syntax_error(
            pos,
            format!("unsupported WDL version {}, expecting {}", text, SUPPORTED_VERSION),
        ));
    }
    Ok(())
}

/// Parse an import statement: import "uri" [as namespace] [alias A as B]*
fn parse_import(walker: &mut Walker) -> ParseResult<()> {
    let start = expect_keyword(&mut walker.stream, "import")?.start;
    let uri = parse_plain_string(&mut walker.stream)?;

    walker.production(Production::Import { uri }, start, |w| {
        if let Some(token) = w.stream.try_consume_keyword("as") {
            let (identifier, _) = parse_identifier(&mut w.stream)?;
            w.leaf(Production::ImportAs { identifier }, token.start);
        }
        while let Some(token) = w.stream.try_consume_keyword("alias") {
            let (original, _) = parse_identifier(&mut w.stream)?;
            expect_keyword(&mut w.stream, "as")?;
            let (alias, _) = parse_identifier(&mut w.stream)?;
            w.leaf(Production::ImportAlias { original, alias }, token.start);
        }
        Ok(())
    })
}

/// Parse a struct definition: struct Name { Type member ... }
fn parse_struct(walker: &mut Walker) -> ParseResult<()> {
    let start = expect_keyword(&mut walker.stream, "struct")?.start;
    let (name, _) = parse_identifier(&mut walker.stream)?;
    walker.production(Production::Struct { name }, start, |w| {
        parse_block_body(w, |w| parse_declaration(w, Initializer::Forbidden))
    })
}

/// Walk a whole document, reporting syntax errors and recovering at the next
/// top-level keyword.
pub fn parse_document(walker: &mut Walker) {
    if let Err(err) = parse_version(walker) {
        walker.report(err);
        if !walker.stream.check_keyword("version") {
            synchronize_document(&mut walker.stream);
        }
    }

    loop {
        let token = walker.stream.peek().clone();
        let result = match &token.token {
            Token::Eof => break,
            Token::Keyword(kw) => match kw.as_str() {
                "import" => parse_import(walker),
                "struct" => parse_struct(walker),
                "task" => parse_task(walker),
                "workflow" => parse_workflow(walker),
                _ => Err(walker.stream.unexpected("'import', 'struct', 'task' or 'workflow'")),
            },
            _ => Err(walker.stream.unexpected("'import', 'struct', 'task' or 'workflow'")),
        };

        if let Err(err) = result {
            walker.report(err);
            if walker.stream.last_end() <= token.start && !walker.stream.is_eof() {
                walker.stream.next();
            }
            synchronize_document(&mut walker.stream);
        }
    }
}
