//! Token definitions for WDL parser

use std::fmt;

/// Token type for WDL lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Keyword(String),
    Identifier(String),

    // Literals keep their source text; the expression compiler reads the value
    IntLiteral(String),
    FloatLiteral(String),
    BoolLiteral(bool),

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Comparison
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Logical
    And,
    Or,
    Not,

    Assign,

    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,

    Comma,
    Dot,
    Colon,
    Question,

    SingleQuote,
    DoubleQuote,
    HeredocStart,
    HeredocEnd,

    /// `~{` or `${`, with the spelling used
    PlaceholderStart(String),
    /// Processed text inside a string literal
    StringText(String),
    /// The closing quote of a string literal
    StringEnd(char),
    /// Verbatim text inside a command
    CommandText(String),

    /// A character that starts no token
    Unknown(char),
    Eof,
}

impl Token {
    pub fn is_keyword(&self, word: &str) -> bool {
        matches!(self, Token::Keyword(kw) if kw == word)
    }

    /// The binary operator symbol of this token, if it is one
    pub fn binary_operator(&self) -> Option<&'static str> {
        let symbol = match self {
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Equal => "==",
            Token::NotEqual => "!=",
            Token::Less => "<",
            Token::LessEqual => "<=",
            Token::Greater => ">",
            Token::GreaterEqual => ">=",
            Token::And => "&&",
            Token::Or => "||",
            _ => return None,
        };
        Some(symbol)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(s) | Token::Identifier(s) => write!(f, "'{}'", s),
            Token::IntLiteral(s) | Token::FloatLiteral(s) => write!(f, "'{}'", s),
            Token::BoolLiteral(b) => write!(f, "'{}'", b),
            Token::Assign => f.write_str("'='"),
            Token::Not => f.write_str("'!'"),
            Token::LeftParen => f.write_str("'('"),
            Token::RightParen => f.write_str("')'"),
            Token::LeftBracket => f.write_str("'['"),
            Token::RightBracket => f.write_str("']'"),
            Token::LeftBrace => f.write_str("'{'"),
            Token::RightBrace => f.write_str("'}'"),
            Token::Comma => f.write_str("','"),
            Token::Dot => f.write_str("'.'"),
            Token::Colon => f.write_str("':'"),
            Token::Question => f.write_str("'?'"),
            Token::SingleQuote => f.write_str("'''"),
            Token::DoubleQuote => f.write_str("'\"'"),
            Token::HeredocStart => f.write_str("'<<<'"),
            Token::HeredocEnd => f.write_str("'>>>'"),
            Token::PlaceholderStart(s) => write!(f, "'{}'", s),
            Token::StringText(s) | Token::CommandText(s) => write!(f, "'{}'", s),
            Token::StringEnd(c) => write!(f, "'{}'", c),
            Token::Unknown(c) => write!(f, "'{}'", c),
            Token::Eof => f.write_str("<EOF>"),
            other => match other.binary_operator() {
                Some(symbol) => write!(f, "'{}'", symbol),
                None => write!(f, "{:?}", other),
            },
        }
    }
}

/// A token with its byte range in the source; `end` is exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedToken {
    pub token: Token,
    pub start: usize,
    pub end: usize,
}

impl LocatedToken {
    pub fn new(token: Token, start: usize, end: usize) -> Self {
        Self { token, start, end }
    }
}
