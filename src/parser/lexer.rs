//! Stateful lexer for WDL parsing
//!
//! Tokens are produced one at a time at a byte offset, in one of three modes:
//! normal WDL code (whitespace and comments skipped), command text, and string
//! literal text. The parser owns the mode stack and switches modes as it enters
//! commands, strings, and placeholders.

use super::keywords::is_keyword;
use super::tokens::{LocatedToken, Token};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit0, digit1, multispace1, one_of, satisfy},
    combinator::{map, opt, recognize, value},
    sequence::{pair, tuple},
    IResult,
};
use nom_locate::LocatedSpan;

pub type Span<'a> = LocatedSpan<&'a str>;

/// How a command block is delimited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStyle {
    /// `command { ... }`: ends at `}`, placeholders `~{` and `${`
    Brace,
    /// `command <<< ... >>>`: ends at `>>>`, placeholders `~{` only
    Heredoc,
}

/// Lexer mode for context-aware tokenization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerMode {
    /// Normal WDL code
    Normal,
    /// Inside a command template
    Command(CommandStyle),
    /// Inside string literal with the opening quote character
    StringLiteral(char),
}

/// Lex the token at `offset` in the given mode. Returns `Eof` at the end of input.
pub fn next_token(source: &str, offset: usize, mode: LexerMode) -> LocatedToken {
    let offset = offset.min(source.len());
    let start = match mode {
        LexerMode::Normal => offset + trivia_len(&source[offset..]),
        _ => offset,
    };
    if start >= source.len() {
        return LocatedToken::new(Token::Eof, source.len(), source.len());
    }

    let input = Span::new(&source[start..]);
    let result = match mode {
        LexerMode::Normal => normal_token(input),
        LexerMode::Command(style) => command_token(input, style),
        LexerMode::StringLiteral(quote) => string_token(input, quote),
    };
    match result {
        Ok((rest, token)) if rest.location_offset() > 0 => {
            LocatedToken::new(token, start, start + rest.location_offset())
        }
        _ => {
            let c = source[start..].chars().next().unwrap_or('\0');
            LocatedToken::new(Token::Unknown(c), start, start + c.len_utf8().max(1))
        }
    }
}

/// Byte length of the whitespace and comments at the start of `input`.
pub fn trivia_len(input: &str) -> usize {
    let span = Span::new(input);
    let trivia: IResult<Span, Span> = recognize(nom::multi::many0(alt((
        multispace1,
        recognize(pair(char('#'), take_while(|c: char| c != '\n'))),
    ))))(span);
    match trivia {
        Ok((rest, _)) => rest.location_offset(),
        Err(_) => 0,
    }
}

// Normal mode

fn float_literal(input: Span) -> IResult<Span, Token> {
    let exponent = || tuple((one_of("eE"), opt(one_of("+-")), digit1));
    map(
        alt((
            recognize(tuple((digit1, char('.'), digit0, opt(exponent())))),
            recognize(tuple((char('.'), digit1, opt(exponent())))),
            recognize(pair(digit1, exponent())),
        )),
        |s: Span| Token::FloatLiteral(s.fragment().to_string()),
    )(input)
}

fn int_literal(input: Span) -> IResult<Span, Token> {
    map(digit1, |s: Span| Token::IntLiteral(s.fragment().to_string()))(input)
}

/// Parse an identifier, keyword, or boolean literal
fn word(input: Span) -> IResult<Span, Token> {
    map(
        recognize(pair(
            satisfy(|c| c.is_ascii_alphabetic()),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        )),
        |s: Span| match *s.fragment() {
            "true" => Token::BoolLiteral(true),
            "false" => Token::BoolLiteral(false),
            w if is_keyword(w) => Token::Keyword(w.to_string()),
            w => Token::Identifier(w.to_string()),
        },
    )(input)
}

fn operator(input: Span) -> IResult<Span, Token> {
    alt((
        value(Token::HeredocStart, tag("<<<")),
        value(Token::HeredocEnd, tag(">>>")),
        value(Token::Equal, tag("==")),
        value(Token::NotEqual, tag("!=")),
        value(Token::LessEqual, tag("<=")),
        value(Token::GreaterEqual, tag(">=")),
        value(Token::And, tag("&&")),
        value(Token::Or, tag("||")),
        value(Token::Plus, char('+')),
        value(Token::Minus, char('-')),
        value(Token::Star, char('*')),
        value(Token::Slash, char('/')),
        value(Token::Percent, char('%')),
        value(Token::Less, char('<')),
        value(Token::Greater, char('>')),
        value(Token::Not, char('!')),
        value(Token::Assign, char('=')),
    ))(input)
}

fn delimiter(input: Span) -> IResult<Span, Token> {
    alt((
        value(Token::LeftParen, char('(')),
        value(Token::RightParen, char(')')),
        value(Token::LeftBracket, char('[')),
        value(Token::RightBracket, char(']')),
        value(Token::LeftBrace, char('{')),
        value(Token::RightBrace, char('}')),
        value(Token::Comma, char(',')),
        value(Token::Dot, char('.')),
        value(Token::Colon, char(':')),
        value(Token::Question, char('?')),
        value(Token::SingleQuote, char('\'')),
        value(Token::DoubleQuote, char('"')),
    ))(input)
}

/// Parse a single token in normal mode; trivia must already be skipped.
pub fn normal_token(input: Span) -> IResult<Span, Token> {
    alt((float_literal, int_literal, word, operator, delimiter))(input)
}

// Command mode

fn placeholder_start(input: Span) -> IResult<Span, Token> {
    map(alt((tag("~{"), tag("${"))), |s: Span| {
        Token::PlaceholderStart(s.fragment().to_string())
    })(input)
}

/// Verbatim command text up to the closing delimiter or a placeholder.
fn command_text(style: CommandStyle) -> impl Fn(Span) -> IResult<Span, Token> {
    move |input: Span| {
        let text = input.fragment();
        let mut end = text.len();
        for (i, c) in text.char_indices() {
            let rest = &text[i..];
            let stop = match (style, c) {
                (CommandStyle::Brace, '}') => true,
                (CommandStyle::Brace, '~' | '$') => {
                    rest.starts_with("~{") || rest.starts_with("${")
                }
                (CommandStyle::Heredoc, '~') => rest.starts_with("~{"),
                (CommandStyle::Heredoc, '>') => rest.starts_with(">>>"),
                _ => false,
            };
            if stop {
                end = i;
                break;
            }
        }
        if end == 0 {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::TakeWhile1,
            )));
        }
        let (rest, taken) = nom::bytes::complete::take(text[..end].chars().count())(input)?;
        Ok((rest, Token::CommandText(taken.fragment().to_string())))
    }
}

/// Parse a single token in command mode
pub fn command_token(input: Span, style: CommandStyle) -> IResult<Span, Token> {
    match style {
        CommandStyle::Brace => alt((
            value(Token::RightBrace, char('}')),
            placeholder_start,
            command_text(style),
        ))(input),
        CommandStyle::Heredoc => alt((
            value(Token::HeredocEnd, tag(">>>")),
            map(tag("~{"), |s: Span| {
                Token::PlaceholderStart(s.fragment().to_string())
            }),
            command_text(style),
        ))(input),
    }
}

// String literal mode

/// String text with escape sequences processed, up to the closing quote or a placeholder.
fn string_text(quote: char) -> impl Fn(Span) -> IResult<Span, Token> {
    move |input: Span| {
        let text = input.fragment();
        let mut result = String::new();
        let mut chars = text.char_indices().peekable();
        let mut end = text.len();
        while let Some((i, c)) = chars.next() {
            let rest = &text[i..];
            if c == quote || c == '\n' || rest.starts_with("~{") || rest.starts_with("${") {
                end = i;
                break;
            }
            if c != '\\' {
                result.push(c);
                continue;
            }
            match chars.next() {
                Some((_, 'n')) => result.push('\n'),
                Some((_, 't')) => result.push('\t'),
                Some((_, 'r')) => result.push('\r'),
                Some((_, e @ ('\\' | '\'' | '"' | '~' | '$'))) => result.push(e),
                Some((j, 'x')) => match unicode_escape(&text[j + 1..], 2) {
                    Some(decoded) => {
                        result.push(decoded);
                        chars.next();
                        chars.next();
                    }
                    None => result.push_str("\\x"),
                },
                Some((j, 'u')) => match unicode_escape(&text[j + 1..], 4) {
                    Some(decoded) => {
                        result.push(decoded);
                        for _ in 0..4 {
                            chars.next();
                        }
                    }
                    None => result.push_str("\\u"),
                },
                Some((_, other)) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        }
        if end == 0 {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::TakeWhile1,
            )));
        }
        let (rest, _) = nom::bytes::complete::take(text[..end].chars().count())(input)?;
        Ok((rest, Token::StringText(result)))
    }
}

fn unicode_escape(digits: &str, len: usize) -> Option<char> {
    let hex = digits.get(..len)?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}

/// Parse a single token in string literal mode
pub fn string_token(input: Span, quote: char) -> IResult<Span, Token> {
    alt((
        placeholder_start,
        map(char(quote), Token::StringEnd),
        string_text(quote),
    ))(input)
}
