//! Token-based statement parsing for WDL workflows

use super::declarations::{parse_declaration, parse_input_block, parse_output_block, Initializer};
use super::events::{Production, Walker};
use super::expressions::parse_expression_node;
use super::parser_utils::{
    expect_keyword, parse_block_body, parse_identifier, parse_qualified_name, ParseResult,
};
use super::tasks::{parse_meta_block, MetaKind};
use super::tokens::Token;
use super::types::starts_declaration;

/// Parse a call statement
pub fn parse_call_statement(walker: &mut Walker) -> ParseResult<()> {
    let start = expect_keyword(&mut walker.stream, "call")?.start;
    let target = parse_qualified_name(&mut walker.stream)?;

    let alias = match walker.stream.try_consume_keyword("as") {
        Some(_) => Some(parse_identifier(&mut walker.stream)?.0),
        None => None,
    };
    let mut after = Vec::new();
    while walker.stream.try_consume_keyword("after").is_some() {
        after.push(parse_identifier(&mut walker.stream)?.0);
    }

    let production = Production::Call {
        target,
        alias,
        after,
    };
    walker.production(production, start, |w| {
        if w.stream.check(&Token::LeftBrace) {
            parse_call_inputs(w)?;
        }
        Ok(())
    })
}

/// Parse `{ input: a = expr, b }`; the `input:` prefix is optional.
fn parse_call_inputs(walker: &mut Walker) -> ParseResult<()> {
    walker.stream.expect(Token::LeftBrace)?;
    if walker.stream.try_consume_keyword("input").is_some() {
        walker.stream.expect(Token::Colon)?;
    }
    while !walker.stream.check(&Token::RightBrace) {
        parse_call_input(walker)?;
        if walker.stream.try_consume(&Token::Comma).is_none() {
            break;
        }
    }
    walker.stream.expect(Token::RightBrace)?;
    Ok(())
}

fn parse_call_input(walker: &mut Walker) -> ParseResult<()> {
    let (key, token) = parse_identifier(&mut walker.stream)?;
    let start = token.start;
    walker.enter(
        Production::CallInput {
            key: key.clone(),
            value_text: String::new(),
        },
        start,
    );

    let (value_start, result) = if walker.stream.try_consume(&Token::Assign).is_some() {
        let value_start = walker.stream.next_start();
        (value_start, parse_expression_node(walker))
    } else {
        // `name` alone binds the input to the identically named value
        let shorthand = walker.production(Production::Expression, start, |w| {
            w.leaf(Production::Identifier { name: key.clone() }, start);
            Ok(())
        });
        (start, shorthand)
    };

    let value_text = walker
        .stream
        .text(value_start, walker.stream.last_end().max(value_start))
        .to_string();
    walker.exit(Production::CallInput { key, value_text }, start);
    result
}

/// Parse a scatter statement: scatter (x in expr) { ... }
pub fn parse_scatter_statement(walker: &mut Walker) -> ParseResult<()> {
    let start = expect_keyword(&mut walker.stream, "scatter")?.start;
    walker.stream.expect(Token::LeftParen)?;
    let (variable, _) = parse_identifier(&mut walker.stream)?;
    expect_keyword(&mut walker.stream, "in")?;

    walker.production(Production::Scatter { variable }, start, |w| {
        parse_expression_node(w)?;
        w.stream.expect(Token::RightParen)?;
        parse_block_body(w, parse_section_element)
    })
}

/// Parse a conditional statement: if (expr) { ... }
pub fn parse_conditional_statement(walker: &mut Walker) -> ParseResult<()> {
    let start = expect_keyword(&mut walker.stream, "if")?.start;
    walker.production(Production::Conditional, start, |w| {
        w.stream.expect(Token::LeftParen)?;
        parse_expression_node(w)?;
        w.stream.expect(Token::RightParen)?;
        parse_block_body(w, parse_section_element)
    })
}

/// Elements allowed inside a scatter or conditional body
fn parse_section_element(walker: &mut Walker) -> ParseResult<()> {
    let token = walker.stream.peek_token().clone();
    match token {
        Token::Keyword(kw) if kw == "call" => parse_call_statement(walker),
        Token::Keyword(kw) if kw == "scatter" => parse_scatter_statement(walker),
        Token::Keyword(kw) if kw == "if" => parse_conditional_statement(walker),
        _ if starts_declaration(&mut walker.stream) => {
            parse_declaration(walker, Initializer::Optional)
        }
        _ => Err(walker.stream.unexpected("'call', 'scatter', 'if' or declaration")),
    }
}

/// Parse the body of a workflow, `{ ... }` included
pub fn parse_workflow_body(walker: &mut Walker) -> ParseResult<()> {
    parse_block_body(walker, parse_workflow_element)
}

/// Parse a single workflow element
pub fn parse_workflow_element(walker: &mut Walker) -> ParseResult<()> {
    let token = walker.stream.peek_token().clone();
    match token {
        Token::Keyword(kw) => match kw.as_str() {
            "input" => parse_input_block(walker),
            "output" => parse_output_block(walker),
            "meta" => parse_meta_block(walker, MetaKind::Meta),
            "parameter_meta" => parse_meta_block(walker, MetaKind::ParameterMeta),
            "call" | "scatter" | "if" => parse_section_element(walker),
            _ if starts_declaration(&mut walker.stream) => {
                parse_declaration(walker, Initializer::Optional)
            }
            _ => Err(walker.stream.unexpected("workflow element")),
        },
        _ if starts_declaration(&mut walker.stream) => {
            parse_declaration(walker, Initializer::Optional)
        }
        _ => Err(walker.stream.unexpected("workflow element")),
    }
}
