//! Parser utility functions for token-based parsing

use super::events::Walker;
use super::keywords::{is_document_keyword, is_element_keyword, is_type_keyword};
use super::token_stream::TokenStream;
use super::tokens::{LocatedToken, Token};
use crate::error::WdlError;

/// Parse result type
pub type ParseResult<T> = Result<T, WdlError>;

/// Expect a specific keyword
pub fn expect_keyword(stream: &mut TokenStream, keyword: &str) -> ParseResult<LocatedToken> {
    match stream.try_consume_keyword(keyword) {
        Some(token) => Ok(token),
        None => Err(stream.unexpected(&format!("'{}'", keyword))),
    }
}

/// Parse an identifier
pub fn parse_identifier(stream: &mut TokenStream) -> ParseResult<(String, LocatedToken)> {
    match stream.peek_token().clone() {
        Token::Identifier(name) => Ok((name, stream.next())),
        _ => Err(stream.unexpected("identifier")),
    }
}

/// A name after `.`, where reserved words such as `left` are allowed.
pub fn parse_member_name(stream: &mut TokenStream) -> ParseResult<String> {
    match stream.peek_token().clone() {
        Token::Identifier(name) | Token::Keyword(name) => {
            stream.next();
            Ok(name)
        }
        _ => Err(stream.unexpected("member name")),
    }
}

/// A possibly dotted name, `a` or `ns.a.b`.
pub fn parse_qualified_name(stream: &mut TokenStream) -> ParseResult<String> {
    let (mut name, _) = parse_identifier(stream)?;
    while stream.try_consume(&Token::Dot).is_some() {
        name.push('.');
        name.push_str(&parse_member_name(stream)?);
    }
    Ok(name)
}

/// Parse `open item (, item)* ,? close`, returning the number of items.
pub fn parse_delimited_list<F>(
    walker: &mut Walker,
    open: Token,
    close: Token,
    mut item: F,
) -> ParseResult<usize>
where
    F: FnMut(&mut Walker) -> ParseResult<()>,
{
    walker.stream.expect(open)?;
    let mut count = 0;
    while !walker.stream.check(&close) {
        item(walker)?;
        count += 1;
        if walker.stream.try_consume(&Token::Comma).is_none() {
            break;
        }
    }
    walker.stream.expect(close)?;
    Ok(count)
}

/// Where recovery stops inside a braced body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPoint {
    /// The body's closing `}`
    Close,
    /// A token that can start the next element
    Element,
    /// A top-level keyword or end of input; the body is abandoned
    Document,
}

/// Skip tokens after a syntax error until the next place an element can start.
///
/// Brace depth is tracked relative to the error, so nested blocks are skipped
/// whole. When `force` is set at least one token is consumed first, unless the
/// stream already sits at a top-level keyword.
pub fn synchronize(stream: &mut TokenStream, force: bool) -> SyncPoint {
    stream.reset_mode();
    let mut force = force;
    let mut depth = 0usize;
    loop {
        let token = stream.peek().clone();
        match &token.token {
            Token::Eof => return SyncPoint::Document,
            Token::Keyword(kw) if is_document_keyword(kw) && kw != "version" => {
                return SyncPoint::Document
            }
            _ if force => {
                force = false;
                skip_one(stream, &mut depth);
            }
            Token::RightBrace if depth == 0 => return SyncPoint::Close,
            Token::Keyword(kw)
                if depth == 0
                    && stream.starts_line(token.start)
                    && (is_element_keyword(kw) || is_type_keyword(kw)) =>
            {
                return SyncPoint::Element
            }
            Token::Identifier(_) if depth == 0 && stream.starts_line(token.start) => {
                return SyncPoint::Element
            }
            _ => skip_one(stream, &mut depth),
        }
    }
}

/// Parse the elements of a `{ ... }` body, recovering from errors in each.
///
/// An error that leaves the body (a top-level keyword or end of input) is
/// returned after being reported, so the enclosing productions unwind too.
pub fn parse_block_body<F>(walker: &mut Walker, mut element: F) -> ParseResult<()>
where
    F: FnMut(&mut Walker) -> ParseResult<()>,
{
    walker.stream.expect(Token::LeftBrace)?;
    loop {
        match walker.stream.peek_token() {
            Token::RightBrace => {
                walker.stream.next();
                return Ok(());
            }
            Token::Eof => return Err(walker.stream.unexpected("'}'")),
            _ => {}
        }
        let start = walker.stream.next_start();
        if let Err(err) = element(walker) {
            let stalled = walker.stream.last_end() <= start;
            let repeated = repeat_error(&err);
            walker.report(err);
            if synchronize(&mut walker.stream, stalled) == SyncPoint::Document {
                log::debug!("abandoning block at {}", walker.stream.offset());
                return Err(repeated);
            }
        }
    }
}

/// A copy of a syntax error, for passing an already reported error outward.
pub fn repeat_error(err: &WdlError) -> WdlError {
    match err {
        WdlError::Syntax { pos, message } => WdlError::syntax_error(pos.clone(), message.clone()),
        other => WdlError::syntax_error(
            other.source_position().cloned().unwrap_or_else(crate::error::SourcePosition::unknown),
            other.to_string(),
        ),
    }
}

/// Skip to the next top-level element keyword.
pub fn synchronize_document(stream: &mut TokenStream) {
    stream.reset_mode();
    loop {
        match stream.peek_token() {
            Token::Eof => return,
            Token::Keyword(kw) if is_document_keyword(kw) => return,
            _ => {
                stream.next();
            }
        }
    }
}

fn skip_one(stream: &mut TokenStream, depth: &mut usize) {
    match stream.next().token {
        Token::LeftBrace => *depth += 1,
        Token::RightBrace => *depth = depth.saturating_sub(1),
        // Skip quoted text as one unit so braces inside strings are ignored
        Token::DoubleQuote | Token::SingleQuote => skip_string(stream),
        _ => {}
    }
}

fn skip_string(stream: &mut TokenStream) {
    let start = stream.last_end();
    let quote = stream.text(start.saturating_sub(1), start);
    let rest = stream.text(start, stream.source().len());
    let mut chars = rest.char_indices();
    let mut end = rest.len();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == '\n' || quote.starts_with(c) {
            end = i + c.len_utf8();
            break;
        }
    }
    stream.advance_to(start + end);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified_name() {
        let mut stream = TokenStream::new("lib.align.left rest", "t.wdl");
        assert_eq!(parse_qualified_name(&mut stream).unwrap(), "lib.align.left");
        assert_eq!(parse_identifier(&mut stream).unwrap().0, "rest");
    }

    #[test]
    fn test_expect_keyword() {
        let mut stream = TokenStream::new("task x", "t.wdl");
        assert!(expect_keyword(&mut stream, "workflow").is_err());
        assert!(expect_keyword(&mut stream, "task").is_ok());
        assert!(parse_identifier(&mut stream).is_ok());
    }

    #[test]
    fn test_synchronize_skips_nested_blocks() {
        let source = "= { a } \"}\" 3\n  Int y\n}";
        let mut stream = TokenStream::new(source, "t.wdl");
        assert_eq!(synchronize(&mut stream, true), SyncPoint::Element);
        assert!(stream.check_keyword("Int"));

        let mut stream = TokenStream::new("1 + }", "t.wdl");
        assert_eq!(synchronize(&mut stream, false), SyncPoint::Close);

        let mut stream = TokenStream::new("1 + \ntask t {}", "t.wdl");
        assert_eq!(synchronize(&mut stream, false), SyncPoint::Document);
        assert!(stream.check_keyword("task"));
    }

    #[test]
    fn test_synchronize_document() {
        let mut stream = TokenStream::new("garbage } { workflow w {}", "t.wdl");
        synchronize_document(&mut stream);
        assert!(stream.check_keyword("workflow"));
    }
}
