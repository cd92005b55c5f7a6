//! Token-based type parsing for WDL
//!
//! Types are kept as normalized text: `Array[File]+?`, `Map[String,Int]`,
//! `Pair[Int,Array[String]]`, or a struct name.

use super::parser_utils::{parse_identifier, ParseResult};
use super::token_stream::TokenStream;
use super::tokens::Token;

/// Parse a type and return its normalized text
pub fn parse_type(stream: &mut TokenStream) -> ParseResult<String> {
    let mut text = match stream.peek_token().clone() {
        Token::Keyword(kw) => match kw.as_str() {
            "Array" => {
                stream.next();
                let inner = parse_parameters(stream, 1)?;
                format!("Array[{}]", inner)
            }
            "Map" | "Pair" => {
                stream.next();
                let inner = parse_parameters(stream, 2)?;
                format!("{}[{}]", kw, inner)
            }
            "Boolean" | "Int" | "Float" | "String" | "File" | "Object" => {
                stream.next();
                kw
            }
            _ => return Err(stream.unexpected("type")),
        },
        Token::Identifier(_) => parse_identifier(stream)?.0,
        _ => return Err(stream.unexpected("type")),
    };

    if text.starts_with("Array[") && stream.try_consume(&Token::Plus).is_some() {
        text.push('+');
    }
    if stream.try_consume(&Token::Question).is_some() {
        text.push('?');
    }
    Ok(text)
}

/// `[T]` or `[K, V]`, returned joined by a bare comma.
fn parse_parameters(stream: &mut TokenStream, count: usize) -> ParseResult<String> {
    stream.expect(Token::LeftBracket)?;
    let mut parameters = Vec::with_capacity(count);
    for i in 0..count {
        if i > 0 {
            stream.expect(Token::Comma)?;
        }
        parameters.push(parse_type(stream)?);
    }
    stream.expect(Token::RightBracket)?;
    Ok(parameters.join(","))
}

/// Whether the next tokens can begin a declaration: a type keyword, or a
/// struct name followed by a declared name.
pub fn starts_declaration(stream: &mut TokenStream) -> bool {
    match stream.peek_token().clone() {
        Token::Keyword(kw) => super::keywords::is_type_keyword(&kw),
        Token::Identifier(_) => {
            let saved = stream.checkpoint();
            stream.next();
            stream.try_consume(&Token::Question);
            let result = matches!(stream.peek_token(), Token::Identifier(_));
            stream.restore(saved);
            result
        }
        _ => false,
    }
}
