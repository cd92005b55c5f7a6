//! Literal parsing: strings with placeholders, compound literals, meta values

use super::events::{Production, Walker};
use super::expressions::{parse_expression, parse_expression_node, parse_unary_expr};
use super::lexer::LexerMode;
use super::parser_utils::{parse_delimited_list, parse_member_name, ParseResult};
use super::token_stream::TokenStream;
use super::tokens::Token;

/// Parse a quoted string, emitting its text parts and placeholders
pub fn parse_string(walker: &mut Walker) -> ParseResult<()> {
    let quote = match walker.stream.peek_token() {
        Token::DoubleQuote => '"',
        Token::SingleQuote => '\'',
        _ => return Err(walker.stream.unexpected("string")),
    };
    let open = walker.stream.next();
    walker.production(Production::StringLiteral, open.start, |w| {
        w.stream.push_mode(LexerMode::StringLiteral(quote));
        let result = parse_string_body(w, quote);
        w.stream.pop_mode();
        result
    })
}

/// Text runs are emitted before each placeholder and before the closing
/// quote, so a string with `n` placeholders has `n + 1` parts.
fn parse_string_body(walker: &mut Walker, quote: char) -> ParseResult<()> {
    let mut text = String::new();
    let mut part_start = walker.stream.offset();
    loop {
        let token = walker.stream.peek().clone();
        match token.token {
            Token::StringText(chunk) => {
                walker.stream.next();
                text.push_str(&chunk);
            }
            Token::PlaceholderStart(_) => {
                let part = Production::StringPart {
                    text: std::mem::take(&mut text),
                };
                walker.leaf(part, part_start);
                walker.stream.next();
                walker.production(Production::Placeholder, token.start, parse_placeholder)?;
                part_start = walker.stream.offset();
            }
            Token::StringEnd(_) => {
                walker.leaf(Production::StringPart { text }, part_start);
                walker.stream.next();
                return Ok(());
            }
            _ => return Err(walker.stream.unexpected(&format!("'{}'", quote))),
        }
    }
}

/// The inside of `~{ ... }` after its opening delimiter, through the closing `}`.
///
/// A placeholder with options (`sep=`, `true=`, `false=`, `default=`) is
/// reported as one opaque expression.
pub fn parse_placeholder(walker: &mut Walker) -> ParseResult<()> {
    walker.stream.push_mode(LexerMode::Normal);
    let result = parse_placeholder_body(walker);
    walker.stream.pop_mode();
    result
}

fn parse_placeholder_body(walker: &mut Walker) -> ParseResult<()> {
    let start = walker.stream.next_start();
    if has_placeholder_option(&mut walker.stream) {
        walker.production(Production::Expression, start, |w| {
            w.buffered(|w| {
                while has_placeholder_option(&mut w.stream) {
                    w.stream.next();
                    w.stream.expect(Token::Assign)?;
                    parse_unary_expr(w)?;
                }
                parse_expression(w)
            })?;
            let text = w.stream.text(start, w.stream.last_end()).to_string();
            w.leaf(Production::Opaque { text }, start);
            Ok(())
        })?;
    } else {
        parse_expression_node(walker)?;
    }
    walker.stream.expect(Token::RightBrace)?;
    Ok(())
}

fn has_placeholder_option(stream: &mut TokenStream) -> bool {
    let is_option = match stream.peek_token() {
        Token::Identifier(name) => name == "sep" || name == "default",
        Token::BoolLiteral(_) => true,
        _ => false,
    };
    if !is_option {
        return false;
    }
    let saved = stream.checkpoint();
    stream.next();
    let result = stream.check(&Token::Assign);
    stream.restore(saved);
    result
}

/// Whether the next tokens open a struct literal, `Name { member: ...`.
pub fn starts_struct_literal(stream: &mut TokenStream) -> bool {
    if !matches!(stream.peek_token(), Token::Identifier(_)) {
        return false;
    }
    let saved = stream.checkpoint();
    stream.next();
    let result = stream.try_consume(&Token::LeftBrace).is_some()
        && match stream.peek_token().clone() {
            Token::RightBrace => true,
            Token::Identifier(_) | Token::Keyword(_) => {
                stream.next();
                stream.check(&Token::Colon)
            }
            _ => false,
        };
    stream.restore(saved);
    result
}

/// Parse an array, map, object, or struct literal. Members are parsed as
/// expressions for their syntax; callers report the whole literal as opaque.
pub fn parse_compound_literal(walker: &mut Walker) -> ParseResult<()> {
    match walker.stream.peek_token().clone() {
        Token::LeftBracket => {
            parse_delimited_list(
                walker,
                Token::LeftBracket,
                Token::RightBracket,
                parse_expression_node,
            )?;
        }
        Token::LeftBrace => {
            parse_delimited_list(walker, Token::LeftBrace, Token::RightBrace, |w| {
                parse_expression_node(w)?;
                w.stream.expect(Token::Colon)?;
                parse_expression_node(w)
            })?;
        }
        Token::Identifier(_) => {
            walker.stream.next();
            parse_object_members(walker)?;
        }
        Token::Keyword(kw) if kw == "object" => {
            walker.stream.next();
            parse_object_members(walker)?;
        }
        _ => return Err(walker.stream.unexpected("literal")),
    }
    Ok(())
}

fn parse_object_members(walker: &mut Walker) -> ParseResult<()> {
    parse_delimited_list(walker, Token::LeftBrace, Token::RightBrace, |w| {
        parse_member_name(&mut w.stream)?;
        w.stream.expect(Token::Colon)?;
        parse_expression_node(w)
    })?;
    Ok(())
}

/// Parse a meta value without emitting events; returns its source text.
///
/// Meta values are JSON-like: strings, numbers, booleans, `null`, arrays, and
/// objects.
pub fn parse_meta_value(stream: &mut TokenStream) -> ParseResult<String> {
    let start = stream.next_start();
    skip_meta_value(stream)?;
    Ok(stream.text(start, stream.last_end()).to_string())
}

fn skip_meta_value(stream: &mut TokenStream) -> ParseResult<()> {
    match stream.peek_token().clone() {
        Token::DoubleQuote | Token::SingleQuote => parse_plain_string(stream).map(|_| ()),
        Token::Minus | Token::Plus => {
            stream.next();
            match stream.peek_token() {
                Token::IntLiteral(_) | Token::FloatLiteral(_) => {
                    stream.next();
                    Ok(())
                }
                _ => Err(stream.unexpected("number")),
            }
        }
        Token::IntLiteral(_) | Token::FloatLiteral(_) | Token::BoolLiteral(_) => {
            stream.next();
            Ok(())
        }
        Token::Identifier(name) if name == "null" => {
            stream.next();
            Ok(())
        }
        Token::LeftBracket => {
            stream.next();
            while !stream.check(&Token::RightBracket) {
                skip_meta_value(stream)?;
                if stream.try_consume(&Token::Comma).is_none() {
                    break;
                }
            }
            stream.expect(Token::RightBracket)?;
            Ok(())
        }
        Token::LeftBrace => {
            stream.next();
            while !stream.check(&Token::RightBrace) {
                parse_member_name(stream)?;
                stream.expect(Token::Colon)?;
                skip_meta_value(stream)?;
                if stream.try_consume(&Token::Comma).is_none() {
                    break;
                }
            }
            stream.expect(Token::RightBrace)?;
            Ok(())
        }
        _ => Err(stream.unexpected("meta value")),
    }
}

/// Parse a string without placeholders and return its processed text.
/// `~{` has no special meaning here, as in meta strings and import URIs.
pub fn parse_plain_string(stream: &mut TokenStream) -> ParseResult<String> {
    let quote = match stream.peek_token() {
        Token::DoubleQuote => '"',
        Token::SingleQuote => '\'',
        _ => return Err(stream.unexpected("string")),
    };
    stream.next();
    stream.push_mode(LexerMode::StringLiteral(quote));
    let mut text = String::new();
    loop {
        match stream.peek_token().clone() {
            Token::StringText(chunk) | Token::PlaceholderStart(chunk) => {
                stream.next();
                text.push_str(&chunk);
            }
            Token::StringEnd(_) => {
                stream.next();
                stream.pop_mode();
                return Ok(text);
            }
            _ => {
                let err = stream.unexpected(&format!("'{}'", quote));
                stream.pop_mode();
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::events::{Event, ParseTreeListener};
    use crate::tree::Span;

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
    }

    impl ParseTreeListener for Recorder {
        fn enter(&mut self, production: &Production, span: Span) {
            self.events.push(Event::Enter(production.clone(), span));
        }

        fn exit(&mut self, production: &Production, span: Span) {
            self.events.push(Event::Exit(production.clone(), span));
        }
    }

    fn string_exits(source: &str) -> Vec<Production> {
        let mut recorder = Recorder::default();
        {
            let mut walker = Walker::new(source, "t.wdl", &mut recorder);
            parse_string(&mut walker).unwrap();
            assert!(walker.stream.is_eof());
        }
        recorder
            .events
            .into_iter()
            .filter_map(|event| match event {
                Event::Exit(production, _) => Some(production),
                Event::Enter(..) => None,
            })
            .collect()
    }

    fn part(text: &str) -> Production {
        Production::StringPart {
            text: text.to_string(),
        }
    }

    #[test]
    fn test_plain_string() {
        assert_eq!(
            string_exits(r#""a\tb""#),
            vec![part("a\tb"), Production::StringLiteral]
        );
        assert_eq!(string_exits("''"), vec![part(""), Production::StringLiteral]);
    }

    #[test]
    fn test_interpolated_string() {
        let exits = string_exits(r#""~{1 + i}""#);
        assert_eq!(exits.first(), Some(&part("")));
        assert_eq!(exits[exits.len() - 2], part(""));
        assert!(exits.contains(&Production::Placeholder));
        assert!(exits.contains(&Production::Infix {
            op: crate::expr::Operator::Add
        }));
    }

    #[test]
    fn test_placeholder_with_options_is_opaque() {
        let exits = string_exits(r#""-f ~{sep=", " files}""#);
        assert_eq!(
            exits,
            vec![
                part("-f "),
                Production::Opaque {
                    text: r#"sep=", " files"#.to_string()
                },
                Production::Expression,
                Production::Placeholder,
                part(""),
                Production::StringLiteral,
            ]
        );
    }

    #[test]
    fn test_nested_string_in_placeholder() {
        let exits = string_exits(r#""a~{"b"}c""#);
        let parts: Vec<_> = exits
            .iter()
            .filter(|p| matches!(p, Production::StringPart { .. }))
            .collect();
        assert_eq!(parts, vec![&part("a"), &part("b"), &part("c")]);
    }

    #[test]
    fn test_unterminated_string() {
        let mut recorder = Recorder::default();
        let mut walker = Walker::new("\"abc\nx", "t.wdl", &mut recorder);
        let err = parse_string(&mut walker).unwrap_err();
        assert!(err.to_string().contains("expecting '\"'"));
    }

    #[test]
    fn test_struct_literal_lookahead() {
        assert!(starts_struct_literal(&mut TokenStream::new("S { a: 1 }", "t.wdl")));
        assert!(starts_struct_literal(&mut TokenStream::new("S {}", "t.wdl")));
        assert!(!starts_struct_literal(&mut TokenStream::new("x { call", "t.wdl")));
        assert!(!starts_struct_literal(&mut TokenStream::new("x + 1", "t.wdl")));
    }

    #[test]
    fn test_parse_plain_string() {
        let mut stream = TokenStream::new(r#"'lib/~{x}\t.wdl' as"#, "t.wdl");
        assert_eq!(parse_plain_string(&mut stream).unwrap(), "lib/~{x}\t.wdl");
        assert!(stream.check_keyword("as"));
    }

    #[test]
    fn test_meta_values() {
        let cases = [
            ("\"a ~{b}\" next", "\"a ~{b}\""),
            ("-1.5 next", "-1.5"),
            ("null next", "null"),
            ("[1, \"two\", {a: true}] next", "[1, \"two\", {a: true}]"),
            ("{ version: \"1.0\", tags: [] } next", "{ version: \"1.0\", tags: [] }"),
        ];
        for (source, expected) in cases {
            let mut stream = TokenStream::new(source, "t.wdl");
            assert_eq!(parse_meta_value(&mut stream).unwrap(), expected);
            assert_eq!(stream.peek_token(), &Token::Identifier("next".to_string()));
        }
        assert!(parse_meta_value(&mut TokenStream::new("1 + 2", "t.wdl")).is_ok());
        assert!(parse_meta_value(&mut TokenStream::new("x", "t.wdl")).is_err());
    }
}
