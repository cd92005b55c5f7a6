//! Document-level parsing tests: versions, imports, declarations, expressions,
//! and the structural guarantees of the tree.

use crate::env::Bindings;
use crate::error::WdlError;
use crate::expr::{evaluate, Expression, ScopeEnvironment};
use crate::parser::{parse_source, ParsedDocument};
use crate::tree::*;
use crate::value::Value;
use pretty_assertions::assert_eq;
use std::collections::HashMap;

/// Parse source that must come out without any error
fn parse_clean(source: &str) -> Document {
    let parsed = parse_source(source, "test.wdl");
    assert!(parsed.syntax_errors.is_empty(), "{:?}", parsed.syntax_errors);
    assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
    parsed.document
}

/// The initializer of the workflow declaration `name`
fn initializer<'d>(doc: &'d Document, name: &str) -> &'d Expression {
    doc.workflow
        .as_ref()
        .and_then(|w| w.declarations().find(|d| d.identifier == name))
        .and_then(|d| d.initializer.as_ref())
        .unwrap_or_else(|| panic!("no initializer for {}", name))
}

const PIPELINE: &str = r#"version 1.1

import "lib/common.wdl" as common

struct Sample {
  String id
  File? reads
}

task align {
  input {
    String sample
    Int threads = 4
  }
  command <<<
    aligner -t ~{threads} ~{sample} > out.bam
  >>>
  runtime {
    cpu: threads
    memory: "~{threads * 2} GB"
  }
  meta {
    author: "lab"
  }
  output {
    File bam = "out.bam"
  }
}

workflow main {
  input {
    Array[String] samples
    Boolean dry_run = false
  }
  scatter (s in samples) {
    if (!dry_run) {
      call align { input: sample = s, threads = 2 + 2 }
    }
  }
  Int total = length(samples)
  output {
    Int n = total
  }
}
"#;

#[cfg(test)]
mod document_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_version_and_empty_workflow() {
        let doc = parse_clean("version 1.1 workflow T {}");
        assert_eq!(doc.version, "1.1");
        assert_eq!(doc.workflow.as_ref().map(|w| w.name.as_str()), Some("T"));
        assert!(doc.tasks.is_empty());
        assert!(doc.imports.is_empty());
    }

    #[test]
    fn test_imports_with_aliases() {
        let doc = parse_clean(
            "version 1.1\nimport \"test.wdl\"\nimport \"http://example.com/lib/analysis_tasks\" as analysis\nimport \"https://example.com/lib/stdlib.wdl\"\n  alias Parent as Parent2\n  alias Child as Child2",
        );
        assert_eq!(doc.imports.len(), 3);

        assert_eq!(doc.imports[0].name, "test");
        assert_eq!(doc.imports[0].alias, "");
        assert_eq!(doc.imports[1].alias, "analysis");
        assert_eq!(doc.imports[1].uri, "http://example.com/lib/analysis_tasks");

        let third = &doc.imports[2];
        assert_eq!(third.name, "stdlib");
        let aliases: Vec<_> = third
            .struct_aliases
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(aliases, vec![("Parent", "Parent2"), ("Child", "Child2")]);

        assert!(doc.import("analysis").is_some());
        assert!(doc.scopes.resolve(doc.scope, "stdlib").is_ok());
    }

    #[test]
    fn test_workflow_inputs_in_order() {
        let doc = parse_clean("version 1.1 workflow T { input { String s\n File f } }");
        let inputs: Vec<_> = doc
            .workflow
            .unwrap()
            .inputs
            .iter()
            .map(|d| (d.identifier.clone(), d.declared_type.clone()))
            .collect();
        assert_eq!(
            inputs,
            vec![
                ("s".to_string(), "String".to_string()),
                ("f".to_string(), "File".to_string())
            ]
        );
    }

    #[test]
    fn test_task_sections() {
        let doc = parse_clean(PIPELINE);
        let task = doc.task("align").unwrap();
        assert_eq!(task.inputs.len(), 2);
        assert_eq!(task.outputs[0].declared_type, "File");
        assert_eq!(task.runtime_value("cpu"), Some("threads"));
        assert_eq!(task.runtime_value("memory"), Some("\"~{threads * 2} GB\""));
        assert_eq!(task.meta.get("author").map(String::as_str), Some("\"lab\""));
        assert_eq!(task.command_placeholders.len(), 2);
        assert_eq!(task.command_placeholders[1].to_string(), "[sample]");

        let def = doc.struct_def("Sample").unwrap();
        assert_eq!(def.members.len(), 2);
        assert!(def.members[1].is_optional());
    }

    #[test]
    fn test_unsupported_version_is_reported() {
        let parsed = parse_source("version 1.0\nworkflow w {}", "old.wdl");
        assert_eq!(parsed.syntax_errors.len(), 1);
        assert_eq!(
            parsed.syntax_errors[0].to_string(),
            "line 1:8 \"unsupported WDL version 1.0, expecting 1.1\""
        );
        assert_eq!(parsed.document.version, "1.0");
        assert!(parsed.document.workflow.is_some());
    }

    #[test]
    fn test_partial_document_after_errors() {
        let parsed = parse_source(
            "version 1.1\ntask broken {\n  Int x = \n}\ntask fine {\n  Int y = 1\n}",
            "test.wdl",
        );
        assert!(!parsed.is_clean());
        let names: Vec<_> = parsed.document.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["broken", "fine"]);
    }
}

#[cfg(test)]
mod expression_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_precedence_compiles_to_rpn() {
        let doc = parse_clean("version 1.1\nworkflow w {\n  input{ Int t = 3+4*2/(1-5*2)+3 }\n}");
        let expr = initializer(&doc, "t");
        assert_eq!(
            expr.to_string(),
            "[3, 4, 2, mul, Expr[1, 5, 2, mul, sub], div, add, 3, add]"
        );
        assert!(expr.is_well_formed());
        assert_eq!(evaluate(expr, &HashMap::new()).unwrap(), Value::int(6));
    }

    #[test]
    fn test_string_interpolation() {
        let doc = parse_clean("version 1.1\nworkflow w {\n  input{ String t = \"~{1 + i}\" }\n}");
        let expr = initializer(&doc, "t");
        assert_eq!(expr.to_string(), "[\"\", Expr[1, i, add], str, \"\", add, add]");

        let env = Bindings::new().bind("i", Value::int(41));
        assert_eq!(evaluate(expr, &env).unwrap(), Value::string("42"));
    }

    #[test]
    fn test_promotion_through_parse() {
        let doc = parse_clean(
            "version 1.1\nworkflow w {\n  Float f = 3 + 4.0\n  Boolean b = true && false\n  String s = \"a\" + 2\n}",
        );
        let env: HashMap<String, Value> = HashMap::new();
        assert_eq!(evaluate(initializer(&doc, "f"), &env).unwrap(), Value::float(7.0));
        assert_eq!(evaluate(initializer(&doc, "b"), &env).unwrap(), Value::boolean(false));
        assert_eq!(evaluate(initializer(&doc, "s"), &env).unwrap(), Value::string("a2"));
    }

    #[test]
    fn test_scope_environment() {
        let doc = parse_clean(
            "version 1.1\nworkflow w {\n  input { Int x }\n  Int a = 2\n  Int b = a * 3\n  Int y = x + b\n  Int p = q\n  Int q = p\n}",
        );
        let scope = doc.workflow.as_ref().unwrap().scope;
        let env = ScopeEnvironment::new(&doc, scope)
            .with_inputs(Bindings::new().bind("x", Value::int(36)));

        let b = initializer(&doc, "b");
        assert_eq!(evaluate(b, &env).unwrap(), Value::int(6));
        assert_eq!(evaluate(initializer(&doc, "y"), &env).unwrap(), Value::int(42));
        assert!(matches!(
            evaluate(initializer(&doc, "p"), &env),
            Err(WdlError::Unresolved { .. })
        ));
    }

    #[test]
    fn test_conditional_and_opaque_forms() {
        let doc = parse_clean(
            "version 1.1\nworkflow w {\n  Int c = if 1 < 2 then 10 else 1 / 0\n  Int n = length([1, 2])\n}",
        );
        let env: HashMap<String, Value> = HashMap::new();
        let c = initializer(&doc, "c");
        assert_eq!(c.to_string(), "[Expr[1, 2, lt], Expr[10], Expr[1, 0, div], cond]");
        assert_eq!(evaluate(c, &env).unwrap(), Value::int(10));

        let n = initializer(&doc, "n");
        assert_eq!(n.to_string(), "[Opaque(length([1, 2]))]");
        assert!(matches!(evaluate(n, &env), Err(WdlError::Unsupported { .. })));
    }

    #[test]
    fn test_expression_spans_point_into_source() {
        let source = "version 1.1\nworkflow w {\n  Int t = -(1 + 2)\n}";
        let doc = parse_clean(source);
        let map = SourceMap::new("test.wdl", source);
        let expr = initializer(&doc, "t");
        assert_eq!(map.slice(source, expr.span), "-(1 + 2)");
        let decl = doc.workflow.as_ref().unwrap().private_decls[0].id;
        assert_eq!(doc.parent_of(expr.id), Some(decl));
    }
}

#[cfg(test)]
mod invariant_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assert_spans_nested(doc: &Document) {
        for id in doc.ast.descendants(doc.id) {
            let span = doc.ast.span(id).unwrap();
            assert!(span.start <= span.end, "{} has span {}", id, span);
            let children = doc.ast.children(id);
            for child in children {
                let inner = doc.ast.span(*child).unwrap();
                assert!(span.contains(&inner), "{} at {} escapes {} at {}", child, inner, id, span);
            }
            for pair in children.windows(2) {
                let (a, b) = (doc.ast.span(pair[0]).unwrap(), doc.ast.span(pair[1]).unwrap());
                assert!(a.end < b.start, "{} and {} overlap or are out of order", a, b);
            }
        }
    }

    #[test]
    fn test_spans_nested_and_ordered() {
        let doc = parse_clean(PIPELINE);
        assert_spans_nested(&doc);
        assert!(doc.ast.descendants(doc.id).len() > 30);
    }

    #[test]
    fn test_spans_nested_after_syntax_errors() {
        let broken = [
            "version 1.1\nworkflow w { Int x = ) }",
            "version 1.1\nworkflow w { Int x = ( }",
            "version 1.1\nworkflow w { Int x = -}\ntask t { Int y = 1 }",
            "version 1.1\ntask t {\n  runtime { cpu: }\n}",
            "version 1.1\nworkflow w {\n  call c { input: a = , b = 2 }\n}",
        ];
        for source in broken {
            let parsed = parse_source(source, "broken.wdl");
            assert!(!parsed.is_clean(), "{}", source);
            let doc = &parsed.document;
            for id in doc.ast.descendants(doc.id) {
                let span = doc.ast.span(id).unwrap();
                for child in doc.ast.children(id) {
                    let inner = doc.ast.span(*child).unwrap();
                    assert!(span.contains(&inner), "{}: {} escapes {}", source, inner, span);
                }
            }
            for expr in doc.expressions() {
                assert!(!expr.rpn.is_empty(), "{}: empty expression {}", source, expr.id);
            }
        }

        let parsed = parse_source("version 1.1\nworkflow w { Int x = ) }", "broken.wdl");
        let decl = &parsed.document.workflow.as_ref().unwrap().private_decls[0];
        assert_eq!(decl.identifier, "x");
        assert!(decl.initializer.is_none());
        assert!(parsed.document.ast.children(decl.id).is_empty());
    }

    #[test]
    fn test_command_round_trip() {
        let doc = parse_clean(PIPELINE);
        let map = SourceMap::new("test.wdl", PIPELINE);
        for task in &doc.tasks {
            let span = task.command_span.unwrap();
            assert_eq!(task.command_text(), map.slice(PIPELINE, span));
        }
        assert_eq!(
            doc.tasks[0].command,
            vec![
                "\n    aligner -t ",
                "~{threads}",
                " ",
                "~{sample}",
                " > out.bam\n  "
            ]
        );
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first: ParsedDocument = parse_source(PIPELINE, "test.wdl");
        let second = parse_source(PIPELINE, "test.wdl");
        assert_eq!(first.document, second.document);
        assert_eq!(first.syntax_errors, second.syntax_errors);
    }

    #[test]
    fn test_duplicate_span_attaches_once() {
        let mut doc = parse_clean("version 1.1 workflow T {}");
        let workflow = doc.workflow.as_ref().unwrap().id;
        let span = Span::new(23, 24);
        let first = doc.ast.new_node(NodeKind::Declaration, span);
        let again = doc.ast.new_node(NodeKind::Declaration, span);
        let pos = crate::error::SourcePosition::unknown();
        assert_eq!(doc.ast.attach_child(workflow, first, &pos).unwrap(), Attached::New);
        assert_eq!(
            doc.ast.attach_child(workflow, again, &pos).unwrap(),
            Attached::Duplicate(first)
        );
        assert_eq!(
            doc.ast.attach_child(workflow, first, &pos).unwrap(),
            Attached::Duplicate(first)
        );
        assert_eq!(doc.ast.children(workflow), &[first]);
    }

    #[test]
    fn test_resolution_finds_nearest_binding() {
        let doc = parse_clean(PIPELINE);
        let workflow = doc.workflow.as_ref().unwrap();
        let task = doc.task("align").unwrap();

        let call = doc.scopes.resolve(workflow.scope, "align").unwrap();
        assert_eq!(call.kind, crate::scope::SymbolKind::Call);
        let from_root = doc.scopes.resolve(doc.scope, "align").unwrap();
        assert_eq!(from_root.kind, crate::scope::SymbolKind::Task);

        let sample = doc.scopes.resolve(task.scope, "sample").unwrap();
        assert_eq!(doc.declaration(sample.node).unwrap().declared_type, "String");
        assert!(doc.scopes.resolve(task.scope, "samples").is_err());
        assert!(doc.scopes.resolve(workflow.scope, "threads").is_err());
        assert!(doc
            .scopes
            .resolve_dotted(workflow.scope, &["align", "threads"])
            .is_ok());
    }
}
