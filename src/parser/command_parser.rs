//! Parser for WDL command blocks
//!
//! Command text is shell code with WDL placeholders, so it is lexed in command
//! mode: verbatim text runs up to the closing delimiter or the next
//! placeholder. Text runs are reported as `command_part` events with their raw
//! source and each placeholder as a `command_placeholder` production holding
//! its compiled expression. Concatenating the parts in order gives back the
//! exact source between the delimiters.

use super::events::{Production, Walker};
use super::lexer::{CommandStyle, LexerMode};
use super::literals::parse_placeholder;
use super::parser_utils::{expect_keyword, ParseResult};
use super::tokens::Token;
use crate::tree::Span;

/// Parse `command { ... }` or `command <<< ... >>>`
pub fn parse_command(walker: &mut Walker) -> ParseResult<()> {
    let start = expect_keyword(&mut walker.stream, "command")?.start;
    let style = match walker.stream.peek_token() {
        Token::LeftBrace => CommandStyle::Brace,
        Token::HeredocStart => CommandStyle::Heredoc,
        _ => return Err(walker.stream.unexpected("'{' or '<<<'")),
    };
    let open = walker.stream.next();

    walker.enter(Production::Command { content: None }, start);
    walker.stream.push_mode(LexerMode::Command(style));
    let result = parse_command_body(walker, style);
    walker.stream.pop_mode();

    let content = match &result {
        Ok(close) if *close > open.end => Some(walker.stream.span(open.end, *close)),
        _ => None,
    };
    walker.exit(Production::Command { content }, start);
    result.map(|_| ())
}

/// Returns the byte offset of the closing delimiter.
fn parse_command_body(walker: &mut Walker, style: CommandStyle) -> ParseResult<usize> {
    loop {
        let token = walker.stream.peek().clone();
        match token.token {
            Token::CommandText(text) => {
                walker.stream.next();
                walker.leaf(Production::CommandPart { text }, token.start);
            }
            Token::PlaceholderStart(_) => {
                walker.stream.next();
                walker.enter(
                    Production::CommandPlaceholder {
                        text: String::new(),
                    },
                    token.start,
                );
                let result = parse_placeholder(walker);
                let text = walker.stream.text(token.start, walker.stream.last_end()).to_string();
                walker.exit(Production::CommandPlaceholder { text }, token.start);
                result?;
            }
            Token::RightBrace if style == CommandStyle::Brace => {
                walker.stream.next();
                return Ok(token.start);
            }
            Token::HeredocEnd if style == CommandStyle::Heredoc => {
                walker.stream.next();
                return Ok(token.start);
            }
            _ => {
                let expected = match style {
                    CommandStyle::Brace => "'}'",
                    CommandStyle::Heredoc => "'>>>'",
                };
                return Err(walker.stream.unexpected(expected));
            }
        }
    }
}
