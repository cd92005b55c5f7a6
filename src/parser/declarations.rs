//! Token-based declaration parsing for WDL

use super::events::{Production, Walker};
use super::expressions::parse_expression_node;
use super::parser_utils::{expect_keyword, parse_block_body, parse_identifier, ParseResult};
use super::tokens::Token;
use super::types::parse_type;

/// Whether a declaration may, must, or must not have `= expression`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initializer {
    Optional,
    Required,
    Forbidden,
}

/// Parse a declaration: Type name (= expression)?
pub fn parse_declaration(walker: &mut Walker, initializer: Initializer) -> ParseResult<()> {
    let start = walker.stream.next_start();
    let declared_type = parse_type(&mut walker.stream)?;
    let (identifier, _) = parse_identifier(&mut walker.stream)?;

    let production = Production::Declaration {
        identifier,
        declared_type,
    };
    walker.production(production, start, |w| match initializer {
        Initializer::Forbidden if w.stream.check(&Token::Assign) => {
            Err(w.stream.unexpected("member declaration"))
        }
        Initializer::Forbidden => Ok(()),
        _ if w.stream.try_consume(&Token::Assign).is_some() => parse_expression_node(w),
        Initializer::Required => Err(w.stream.unexpected("'='")),
        Initializer::Optional => Ok(()),
    })
}

/// Parse an input section; inputs may be unbound
pub fn parse_input_block(walker: &mut Walker) -> ParseResult<()> {
    let start = expect_keyword(&mut walker.stream, "input")?.start;
    walker.production(Production::InputBlock, start, |w| {
        parse_block_body(w, |w| parse_declaration(w, Initializer::Optional))
    })
}

/// Parse an output section; every output needs an expression
pub fn parse_output_block(walker: &mut Walker) -> ParseResult<()> {
    let start = expect_keyword(&mut walker.stream, "output")?.start;
    walker.production(Production::OutputBlock, start, |w| {
        parse_block_body(w, |w| parse_declaration(w, Initializer::Required))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::events::ParseTreeListener;
    use crate::tree::Span;

    #[derive(Default)]
    struct Recorder {
        exits: Vec<(Production, Span)>,
    }

    impl ParseTreeListener for Recorder {
        fn enter(&mut self, _production: &Production, _span: Span) {}

        fn exit(&mut self, production: &Production, span: Span) {
            self.exits.push((production.clone(), span));
        }
    }

    fn walk(source: &str, parse: fn(&mut Walker) -> ParseResult<()>) -> (Recorder, usize) {
        let mut recorder = Recorder::default();
        let errors = {
            let mut walker = Walker::new(source, "t.wdl", &mut recorder);
            if let Err(err) = parse(&mut walker) {
                walker.report(err);
            }
            walker.error_count()
        };
        (recorder, errors)
    }

    fn declarations(recorder: &Recorder) -> Vec<(String, String)> {
        recorder
            .exits
            .iter()
            .filter_map(|(p, _)| match p {
                Production::Declaration {
                    identifier,
                    declared_type,
                } => Some((identifier.clone(), declared_type.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_declaration_span() {
        let (recorder, errors) = walk("Array[Int]+ xs = [1]", |w| {
            parse_declaration(w, Initializer::Optional)
        });
        assert_eq!(errors, 0);
        let (production, span) = recorder.exits.last().unwrap();
        assert_eq!(
            production,
            &Production::Declaration {
                identifier: "xs".to_string(),
                declared_type: "Array[Int]+".to_string()
            }
        );
        assert_eq!(*span, Span::new(0, 19));
    }

    #[test]
    fn test_input_block() {
        let (recorder, errors) = walk("input {\n  String s\n  File f\n}", parse_input_block);
        assert_eq!(errors, 0);
        assert_eq!(
            declarations(&recorder),
            vec![
                ("s".to_string(), "String".to_string()),
                ("f".to_string(), "File".to_string())
            ]
        );
        assert_eq!(recorder.exits.last().unwrap().0, Production::InputBlock);
    }

    #[test]
    fn test_output_requires_expression() {
        let (recorder, errors) = walk("output {\n  File out\n  Int n = 1\n}", parse_output_block);
        assert_eq!(errors, 1);
        assert_eq!(declarations(&recorder).len(), 2);
        assert_eq!(recorder.exits.last().unwrap().0, Production::OutputBlock);
    }

    #[test]
    fn test_recovery_inside_block() {
        let source = "input {\n  Int = 3\n  String name\n}";
        let (recorder, errors) = walk(source, parse_input_block);
        assert_eq!(errors, 1);
        assert_eq!(
            declarations(&recorder),
            vec![("name".to_string(), "String".to_string())]
        );
    }
}
