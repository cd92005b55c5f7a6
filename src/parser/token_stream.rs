//! Token stream for parsing WDL
//!
//! Tokens are lexed lazily at the current byte offset in the mode on top of the
//! mode stack. The single peeked token is discarded whenever the mode changes,
//! so the next token is always lexed under the mode in force.

use super::lexer::{next_token, LexerMode};
use super::tokens::{LocatedToken, Token};
use crate::error::{SourcePosition, WdlError};
use crate::tree::{SourceMap, Span};

/// Saved stream state for backtracking
#[derive(Debug, Clone)]
pub struct Checkpoint {
    offset: usize,
    last_end: usize,
    modes: Vec<LexerMode>,
}

/// A stream of tokens with lazy tokenization and one-token lookahead
#[derive(Debug)]
pub struct TokenStream<'a> {
    source: &'a str,
    map: SourceMap,
    /// Byte offset where the next token is lexed from
    offset: usize,
    /// End of the last consumed token
    last_end: usize,
    modes: Vec<LexerMode>,
    peeked: Option<LocatedToken>,
}

impl<'a> TokenStream<'a> {
    pub fn new(source: &'a str, uri: &str) -> Self {
        Self {
            source,
            map: SourceMap::new(uri, source),
            offset: 0,
            last_end: 0,
            modes: vec![LexerMode::Normal],
            peeked: None,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.map
    }

    pub fn mode(&self) -> LexerMode {
        self.modes.last().copied().unwrap_or(LexerMode::Normal)
    }

    pub fn push_mode(&mut self, mode: LexerMode) {
        self.modes.push(mode);
        self.peeked = None;
    }

    pub fn pop_mode(&mut self) {
        if self.modes.len() > 1 {
            self.modes.pop();
        }
        self.peeked = None;
    }

    /// Drop back to normal mode, as after a syntax error inside a command or string.
    pub fn reset_mode(&mut self) {
        self.modes.truncate(1);
        self.peeked = None;
    }

    pub fn peek(&mut self) -> &LocatedToken {
        let (source, offset, mode) = (self.source, self.offset, self.mode());
        self.peeked
            .get_or_insert_with(|| next_token(source, offset, mode))
    }

    pub fn peek_token(&mut self) -> &Token {
        &self.peek().token
    }

    pub fn next(&mut self) -> LocatedToken {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => next_token(self.source, self.offset, self.mode()),
        };
        self.offset = token.end;
        if token.token != Token::Eof {
            self.last_end = token.end;
        }
        token
    }

    pub fn is_eof(&mut self) -> bool {
        self.peek().token == Token::Eof
    }

    pub fn check(&mut self, token: &Token) -> bool {
        self.peek_token() == token
    }

    pub fn check_keyword(&mut self, keyword: &str) -> bool {
        self.peek_token().is_keyword(keyword)
    }

    /// Consume the next token if it equals `token`.
    pub fn try_consume(&mut self, token: &Token) -> Option<LocatedToken> {
        if self.check(token) {
            Some(self.next())
        } else {
            None
        }
    }

    pub fn try_consume_keyword(&mut self, keyword: &str) -> Option<LocatedToken> {
        if self.check_keyword(keyword) {
            Some(self.next())
        } else {
            None
        }
    }

    pub fn expect(&mut self, token: Token) -> Result<LocatedToken, WdlError> {
        if self.check(&token) {
            Ok(self.next())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    /// Syntax error at the next token, naming what was expected.
    pub fn unexpected(&mut self, expected: &str) -> WdlError {
        let found = self.peek().clone();
        let message = match found.token {
            Token::Eof => format!("missing {} at <EOF>", expected),
            ref token => format!("mismatched input {} expecting {}", token, expected),
        };
        WdlError::syntax_error(self.byte_position(found.start, found.end), message)
    }

    /// Byte offset where the next token will be lexed from
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// End of the last consumed token
    pub fn last_end(&self) -> usize {
        self.last_end
    }

    /// Start of the next token, after skipping trivia
    pub fn next_start(&mut self) -> usize {
        self.peek().start
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            offset: self.offset,
            last_end: self.last_end,
            modes: self.modes.clone(),
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.offset = checkpoint.offset;
        self.last_end = checkpoint.last_end;
        self.modes = checkpoint.modes;
        self.peeked = None;
    }

    /// Skip raw source up to `byte`, as when abandoning a malformed string.
    pub fn advance_to(&mut self, byte: usize) {
        let byte = byte.min(self.source.len());
        if byte > self.offset {
            self.offset = byte;
            self.last_end = byte;
            self.peeked = None;
        }
    }

    /// Source text between two byte offsets.
    pub fn text(&self, start: usize, end: usize) -> &'a str {
        let end = end.min(self.source.len());
        self.source.get(start.min(end)..end).unwrap_or("")
    }

    /// Character span of a half-open byte range.
    pub fn span(&self, start: usize, end: usize) -> Span {
        self.map.span_of_bytes(start, end)
    }

    pub fn byte_position(&self, start: usize, end: usize) -> SourcePosition {
        self.map.byte_position(start, end)
    }

    /// Whether only whitespace precedes `byte` on its line.
    pub fn starts_line(&self, byte: usize) -> bool {
        let before = self.text(0, byte);
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        before[line_start..].chars().all(char::is_whitespace)
    }
}
