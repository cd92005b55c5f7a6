//! Token-based task and workflow parsing for WDL

use super::command_parser::parse_command;
use super::declarations::{parse_declaration, parse_input_block, parse_output_block, Initializer};
use super::events::{Production, Walker};
use super::expressions::parse_expression_node;
use super::literals::parse_meta_value;
use super::parser_utils::{
    expect_keyword, parse_block_body, parse_identifier, parse_member_name, ParseResult,
};
use super::statements::parse_workflow_body;
use super::tokens::Token;
use super::types::starts_declaration;

/// Which metadata section a block is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKind {
    Meta,
    ParameterMeta,
}

/// Parse a meta or parameter_meta section. Values are recorded as raw text.
pub fn parse_meta_block(walker: &mut Walker, kind: MetaKind) -> ParseResult<()> {
    let (keyword, block) = match kind {
        MetaKind::Meta => ("meta", Production::MetaBlock),
        MetaKind::ParameterMeta => ("parameter_meta", Production::ParameterMetaBlock),
    };
    let start = expect_keyword(&mut walker.stream, keyword)?.start;
    walker.production(block, start, |w| {
        parse_block_body(w, |w| {
            let start = w.stream.next_start();
            let key = parse_member_name(&mut w.stream)?;
            w.stream.expect(Token::Colon)?;
            let value_text = parse_meta_value(&mut w.stream)?;
            let production = match kind {
                MetaKind::Meta => Production::MetaKv { key, value_text },
                MetaKind::ParameterMeta => Production::ParameterMetaKv { key, value_text },
            };
            w.leaf(production, start);
            Ok(())
        })
    })
}

/// Parse a runtime section; each value is an expression
fn parse_runtime_section(walker: &mut Walker) -> ParseResult<()> {
    let start = expect_keyword(&mut walker.stream, "runtime")?.start;
    walker.production(Production::RuntimeBlock, start, |w| {
        parse_block_body(w, parse_runtime_kv)
    })
}

fn parse_runtime_kv(walker: &mut Walker) -> ParseResult<()> {
    let start = walker.stream.next_start();
    let key = parse_member_name(&mut walker.stream)?;
    walker.stream.expect(Token::Colon)?;

    walker.enter(
        Production::RuntimeKv {
            key: key.clone(),
            value_text: String::new(),
        },
        start,
    );
    let value_start = walker.stream.next_start();
    let result = parse_expression_node(walker);
    let value_text = walker
        .stream
        .text(value_start, walker.stream.last_end().max(value_start))
        .to_string();
    walker.exit(Production::RuntimeKv { key, value_text }, start);
    result
}

/// Parse a task definition
pub fn parse_task(walker: &mut Walker) -> ParseResult<()> {
    let start = expect_keyword(&mut walker.stream, "task")?.start;
    let (name, _) = parse_identifier(&mut walker.stream)?;
    walker.production(Production::Task { name }, start, |w| {
        parse_block_body(w, parse_task_element)
    })
}

fn parse_task_element(walker: &mut Walker) -> ParseResult<()> {
    let token = walker.stream.peek_token().clone();
    match token {
        Token::Keyword(kw) if kw == "input" => parse_input_block(walker),
        Token::Keyword(kw) if kw == "output" => parse_output_block(walker),
        Token::Keyword(kw) if kw == "command" => parse_command(walker),
        Token::Keyword(kw) if kw == "runtime" => parse_runtime_section(walker),
        Token::Keyword(kw) if kw == "meta" => parse_meta_block(walker, MetaKind::Meta),
        Token::Keyword(kw) if kw == "parameter_meta" => {
            parse_meta_block(walker, MetaKind::ParameterMeta)
        }
        _ if starts_declaration(&mut walker.stream) => {
            parse_declaration(walker, Initializer::Optional)
        }
        _ => Err(walker.stream.unexpected("task element")),
    }
}

/// Parse a workflow definition
pub fn parse_workflow(walker: &mut Walker) -> ParseResult<()> {
    let start = expect_keyword(&mut walker.stream, "workflow")?.start;
    let (name, _) = parse_identifier(&mut walker.stream)?;
    walker.production(Production::Workflow { name }, start, parse_workflow_body)
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

    fn walk(source: &str, parse: fn(&mut Walker) -> ParseResult<()>) -> (Vec<Production>, usize) {
        let mut recorder = Recorder::default();
        let errors = {
            let mut walker = Walker::new(source, "t.wdl", &mut recorder);
            if let Err(err) = parse(&mut walker) {
                walker.report(err);
            }
            walker.error_count()
        };
        (recorder.exits.into_iter().map(|(p, _)| p).collect(), errors)
    }

    const TASK: &str = r#"task hello {
  input {
    String name
  }
  command <<<
    echo "Hello ~{name}"
  >>>
  runtime {
    docker: "ubuntu:" + "22.04"
    memory: "2 GB"
  }
  meta {
    author: "someone"
    tags: ["a", "b"]
  }
  parameter_meta {
    name: { help: "who to greet" }
  }
  output {
    String out = read_string(stdout())
  }
}"#;

    #[test]
    fn test_task_sections() {
        let (exits, errors) = walk(TASK, parse_task);
        assert_eq!(errors, 0);
        assert!(exits.contains(&Production::RuntimeKv {
            key: "docker".to_string(),
            value_text: "\"ubuntu:\" + \"22.04\"".to_string()
        }));
        assert!(exits.contains(&Production::MetaKv {
            key: "tags".to_string(),
            value_text: "[\"a\", \"b\"]".to_string()
        }));
        assert!(exits.contains(&Production::ParameterMetaKv {
            key: "name".to_string(),
            value_text: "{ help: \"who to greet\" }".to_string()
        }));
        assert!(exits.contains(&Production::Opaque {
            text: "read_string(stdout())".to_string()
        }));
        assert_eq!(
            exits.last(),
            Some(&Production::Task {
                name: "hello".to_string()
            })
        );
    }

    #[test]
    fn test_task_rejects_calls() {
        let (exits, errors) = walk("task t {\n  call x\n  Int y = 1\n}", parse_task);
        assert_eq!(errors, 1);
        assert!(exits.contains(&Production::Declaration {
            identifier: "y".to_string(),
            declared_type: "Int".to_string()
        }));
    }

    #[test]
    fn test_workflow_missing_brace_stops_at_next_task() {
        let source = "workflow w {\n  Int x = 1\ntask t {}";
        let mut recorder = Recorder::default();
        let result = {
            let mut walker = Walker::new(source, "t.wdl", &mut recorder);
            let result = parse_workflow(&mut walker);
            assert!(walker.stream.check_keyword("task"));
            result
        };
        assert!(result.is_err());
        let (last, span) = recorder.exits.last().unwrap();
        assert_eq!(
            last,
            &Production::Workflow {
                name: "w".to_string()
            }
        );
        assert_eq!(*span, Span::new(0, 23));
    }
}
