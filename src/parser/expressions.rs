//! Expression grammar for WDL
//!
//! Binary operators use precedence climbing; each infix production is exited
//! after its right operand, so listeners see operands before operators.
//! Operands of unary operators, groups, and conditional branches are wrapped in
//! their own `Expression` production.
//!
//! Postfix chains are parsed with their events held back. A bare identifier
//! with `.member` accesses is released as is; anything else with a postfix
//! (indexing, application, access on a non-name) and every compound literal is
//! reported as a single `Opaque` leaf carrying its source text.

use super::events::{Production, Walker};
use super::literals::{parse_compound_literal, parse_string, starts_struct_literal};
use super::parser_utils::{expect_keyword, parse_delimited_list, parse_member_name, ParseResult};
use super::tokens::Token;
use crate::error::WdlError;
use crate::expr::{LiteralClass, Operator};

/// How a primary expression can be compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    /// A bare or dotted name
    Name,
    /// Compiles to RPN
    Plain,
    /// Kept as source text
    Compound,
}

/// Parse a complete expression inside its own `Expression` production
pub fn parse_expression_node(walker: &mut Walker) -> ParseResult<()> {
    let start = walker.stream.next_start();
    walker.production(Production::Expression, start, parse_expression)
}

/// Parse any expression
pub fn parse_expression(walker: &mut Walker) -> ParseResult<()> {
    parse_binary_expr(walker, 1)
}

/// Get operator precedence
fn get_precedence(token: &Token) -> Option<u8> {
    match token {
        Token::Or => Some(1),
        Token::And => Some(2),
        Token::Equal | Token::NotEqual => Some(3),
        Token::Less | Token::LessEqual | Token::Greater | Token::GreaterEqual => Some(4),
        Token::Plus | Token::Minus => Some(5),
        Token::Star | Token::Slash | Token::Percent => Some(6),
        _ => None,
    }
}

/// Parse binary expression with operator precedence
fn parse_binary_expr(walker: &mut Walker, min_precedence: u8) -> ParseResult<()> {
    let start = walker.stream.next_start();
    parse_unary_expr(walker)?;

    loop {
        let token = walker.stream.peek().clone();
        let precedence = match get_precedence(&token.token) {
            Some(prec) if prec >= min_precedence => prec,
            _ => break,
        };
        let op = match token.token.binary_operator().and_then(Operator::from_symbol) {
            Some(op) => op,
            None => break,
        };
        walker.stream.next();

        let infix = Production::Infix { op };
        walker.enter(infix.clone(), token.start);
        let right = parse_binary_expr(walker, precedence + 1);
        walker.exit(infix, start);
        right?;
    }

    Ok(())
}

/// Parse unary expression; the operand is a nested expression.
pub fn parse_unary_expr(walker: &mut Walker) -> ParseResult<()> {
    let token = walker.stream.peek().clone();
    let production = match token.token {
        Token::Not => Production::LogicalNot,
        Token::Minus => Production::UnarySign { negative: true },
        Token::Plus => Production::UnarySign { negative: false },
        _ => return parse_postfix_expr(walker),
    };
    walker.stream.next();
    walker.production(production, token.start, |w| {
        let operand_start = w.stream.next_start();
        w.production(Production::Expression, operand_start, parse_unary_expr)
    })
}

/// Parse postfix expressions (member access, indexing, function application)
fn parse_postfix_expr(walker: &mut Walker) -> ParseResult<()> {
    let start = walker.stream.next_start();
    let (form, events) = walker.buffered(|w| {
        let mut form = parse_primary_expr(w)?;
        loop {
            let token = w.stream.peek().clone();
            match token.token {
                Token::Dot => {
                    w.stream.next();
                    let member = parse_member_name(&mut w.stream)?;
                    if form == Form::Name {
                        w.leaf(Production::MemberAccess { member }, token.start);
                    } else {
                        form = Form::Compound;
                    }
                }
                Token::LeftBracket => {
                    w.stream.next();
                    parse_expression_node(w)?;
                    w.stream.expect(Token::RightBracket)?;
                    form = Form::Compound;
                }
                Token::LeftParen if form == Form::Name => {
                    parse_delimited_list(
                        w,
                        Token::LeftParen,
                        Token::RightParen,
                        parse_expression_node,
                    )?;
                    form = Form::Compound;
                }
                _ => break,
            }
        }
        Ok(form)
    })?;

    if form == Form::Compound {
        let text = walker.stream.text(start, walker.stream.last_end()).to_string();
        log::trace!("opaque expression `{}`", text);
        walker.leaf(Production::Opaque { text }, start);
    } else {
        walker.replay(events);
    }
    Ok(())
}

/// Parse primary expression
fn parse_primary_expr(walker: &mut Walker) -> ParseResult<Form> {
    let token = walker.stream.peek().clone();
    match &token.token {
        Token::IntLiteral(text) => {
            walker.stream.next();
            if text.parse::<i64>().is_err() {
                let pos = walker.stream.byte_position(token.start, token.end);
                walker.report(WdlError::syntax_error(
                    pos,
                    format!("integer literal {} out of range", text),
                ));
            }
            let literal = Production::Literal {
                class: LiteralClass::Int,
                text: text.clone(),
            };
            walker.leaf(literal, token.start);
            Ok(Form::Plain)
        }
        Token::FloatLiteral(text) => {
            walker.stream.next();
            let literal = Production::Literal {
                class: LiteralClass::Float,
                text: text.clone(),
            };
            walker.leaf(literal, token.start);
            Ok(Form::Plain)
        }
        Token::BoolLiteral(value) => {
            walker.stream.next();
            let literal = Production::Literal {
                class: LiteralClass::Bool,
                text: value.to_string(),
            };
            walker.leaf(literal, token.start);
            Ok(Form::Plain)
        }
        Token::Keyword(kw) if kw == "None" => {
            walker.stream.next();
            let literal = Production::Literal {
                class: LiteralClass::None,
                text: kw.clone(),
            };
            walker.leaf(literal, token.start);
            Ok(Form::Plain)
        }
        Token::Keyword(kw) if kw == "if" => {
            parse_if_then_else(walker)?;
            Ok(Form::Plain)
        }
        Token::Keyword(kw) if kw == "object" => {
            parse_compound_literal(walker)?;
            Ok(Form::Compound)
        }
        Token::Identifier(name) => {
            if starts_struct_literal(&mut walker.stream) {
                parse_compound_literal(walker)?;
                return Ok(Form::Compound);
            }
            walker.stream.next();
            walker.leaf(Production::Identifier { name: name.clone() }, token.start);
            Ok(Form::Name)
        }
        Token::DoubleQuote | Token::SingleQuote => {
            parse_string(walker)?;
            Ok(Form::Plain)
        }
        Token::LeftParen => parse_group_or_pair(walker),
        Token::LeftBracket | Token::LeftBrace => {
            parse_compound_literal(walker)?;
            Ok(Form::Compound)
        }
        _ => Err(walker.stream.unexpected("expression")),
    }
}

/// `( expr )` is a group; `( expr, expr )` is a pair literal.
fn parse_group_or_pair(walker: &mut Walker) -> ParseResult<Form> {
    let open = walker.stream.expect(Token::LeftParen)?;
    walker.production(Production::Group, open.start, |w| {
        parse_expression_node(w)?;
        if w.stream.try_consume(&Token::Comma).is_some() {
            parse_expression_node(w)?;
            w.stream.expect(Token::RightParen)?;
            return Ok(Form::Compound);
        }
        w.stream.expect(Token::RightParen)?;
        Ok(Form::Plain)
    })
}

/// `if c then a else b`; each operand is a nested expression.
fn parse_if_then_else(walker: &mut Walker) -> ParseResult<()> {
    let start = expect_keyword(&mut walker.stream, "if")?.start;
    walker.production(Production::Ternary, start, |w| {
        parse_expression_node(w)?;
        expect_keyword(&mut w.stream, "then")?;
        parse_expression_node(w)?;
        expect_keyword(&mut w.stream, "else")?;
        parse_expression_node(w)
    })
}
