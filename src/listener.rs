//! Builds the typed [`Document`] from parse-tree events.
//!
//! [`AstBuilder`] keeps a stack of open sections. A section opening event
//! allocates its arena node after checking that the enclosing node accepts it;
//! the matching close fixes the node's span, defines its symbol, links the node
//! under its parent, and moves the typed node into its owner's lists. Sections
//! that cannot be attached are still tracked on the stack so their children
//! are dropped with them.
//!
//! Expression productions go to the [`ExpressionCompiler`]; each outermost
//! expression is handed to the innermost open section when it closes.

use crate::config::ParseOptions;
use crate::error::{MultiErrorContext, SourcePosition, WdlError};
use crate::expr::{Expression, ExpressionCompiler};
use crate::parser::events::{ParseTreeListener, Production};
use crate::scope::{ScopeId, Symbol, SymbolKind};
use crate::tree::{
    insert_in_source_order, Attached, Call, Decl, Document, Import, KeyValue, NodeId, NodeKind,
    SectionKind, SourceMap, Span, StructDef, Task, Workflow, WorkflowSection,
};

/// Where a key-value entry lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    CallInput,
    Runtime,
    Meta,
    ParameterMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclSection {
    Input,
    Private,
    Output,
}

#[derive(Debug)]
enum Context {
    Import(Import),
    Struct(StructDef),
    Workflow(Workflow),
    Task(Task),
    /// input, output, meta, parameter_meta or runtime
    Block(NodeKind),
    Declaration(Decl),
    Call(Call),
    Entry(KeyValue, EntryKind),
    Command,
    CommandPlaceholder,
    Section(WorkflowSection),
    /// Not attached; everything inside is dropped
    Rejected,
}

#[derive(Debug)]
struct Frame {
    production: &'static str,
    start: usize,
    node: Option<NodeId>,
    context: Context,
}

/// Listener that assembles a [`Document`] during one walk.
pub struct AstBuilder<'s> {
    source: &'s str,
    map: SourceMap,
    document: Document,
    compiler: ExpressionCompiler,
    errors: MultiErrorContext,
    options: ParseOptions,
    stack: Vec<Frame>,
}

fn node_kind(production: &Production) -> Option<NodeKind> {
    let kind = match production {
        Production::Import { .. } => NodeKind::Import,
        Production::Struct { .. } => NodeKind::Struct,
        Production::Workflow { .. } => NodeKind::Workflow,
        Production::Task { .. } => NodeKind::Task,
        Production::InputBlock => NodeKind::InputBlock,
        Production::OutputBlock => NodeKind::OutputBlock,
        Production::MetaBlock => NodeKind::MetaBlock,
        Production::ParameterMetaBlock => NodeKind::ParameterMetaBlock,
        Production::RuntimeBlock => NodeKind::RuntimeBlock,
        Production::Declaration { .. } => NodeKind::Declaration,
        Production::Call { .. } => NodeKind::Call,
        Production::CallInput { .. }
        | Production::MetaKv { .. }
        | Production::ParameterMetaKv { .. }
        | Production::RuntimeKv { .. } => NodeKind::KeyValue,
        Production::Command { .. } => NodeKind::Command,
        Production::Scatter { .. } | Production::Conditional => NodeKind::Section,
        _ => return None,
    };
    Some(kind)
}

fn decl_list(context: &mut Context, section: DeclSection) -> Option<&mut Vec<Decl>> {
    let (inputs, private_decls, outputs) = match context {
        Context::Workflow(w) => (&mut w.inputs, &mut w.private_decls, &mut w.outputs),
        Context::Task(t) => (&mut t.inputs, &mut t.private_decls, &mut t.outputs),
        Context::Struct(s) => return Some(&mut s.members),
        _ => return None,
    };
    Some(match section {
        DeclSection::Input => inputs,
        DeclSection::Private => private_decls,
        DeclSection::Output => outputs,
    })
}

impl<'s> AstBuilder<'s> {
    pub fn new(source: &'s str, path: &str, options: ParseOptions) -> Self {
        let map = SourceMap::new(path, source);
        let document = Document::new(path, map.char_len());
        Self {
            source,
            map,
            document,
            compiler: ExpressionCompiler::new(),
            errors: MultiErrorContext::new(),
            options,
            stack: Vec::new(),
        }
    }

    /// Close whatever the walk left open, link calls to local tasks, and
    /// return the document with the semantic errors sorted by position.
    pub fn finish(mut self) -> (Document, Vec<WdlError>) {
        if self.compiler.is_active() {
            log::debug!("discarding {} open expression(s)", self.compiler.depth());
            self.compiler.reset();
        }
        let end = self.document.span.end;
        while let Some(frame) = self.stack.pop() {
            let span = Span::new(frame.start, end.max(frame.start));
            self.errors.append(WdlError::MismatchContext {
                pos: self.map.position(span),
                expected: frame.production.to_string(),
                found: "end of input".to_string(),
            });
            self.close(frame, span, None);
        }
        self.link_calls();
        (self.document, self.errors.into_errors())
    }

    fn position(&self, span: Span) -> SourcePosition {
        self.map.position(span)
    }

    /// Node that new children attach to; `None` inside a rejected section.
    fn attach_target(&self) -> Option<NodeId> {
        for frame in self.stack.iter().rev() {
            if matches!(frame.context, Context::Rejected) {
                return None;
            }
            if frame.node.is_some() {
                return frame.node;
            }
        }
        Some(self.document.id)
    }

    fn owner_mut(&mut self) -> Option<&mut Context> {
        self.stack
            .iter_mut()
            .rev()
            .map(|f| &mut f.context)
            .find(|c| matches!(c, Context::Workflow(_) | Context::Task(_) | Context::Struct(_)))
    }

    fn owner(&self) -> Option<&Context> {
        self.stack
            .iter()
            .rev()
            .map(|f| &f.context)
            .find(|c| matches!(c, Context::Workflow(_) | Context::Task(_) | Context::Struct(_)))
    }

    fn task_mut(&mut self) -> Option<&mut Task> {
        match self.owner_mut() {
            Some(Context::Task(task)) => Some(task),
            _ => None,
        }
    }

    fn workflow_mut(&mut self) -> Option<&mut Workflow> {
        match self.owner_mut() {
            Some(Context::Workflow(workflow)) => Some(workflow),
            _ => None,
        }
    }

    /// Scope that declarations and calls are defined in
    fn current_scope(&self) -> ScopeId {
        match self.owner() {
            Some(Context::Workflow(w)) => w.scope,
            Some(Context::Task(t)) => t.scope,
            Some(Context::Struct(s)) => s.scope,
            _ => self.document.scope,
        }
    }

    fn duplicate_key(&self, production: &Production) -> Option<String> {
        let present = match production {
            Production::CallInput { key, .. } => match self.stack.last().map(|f| &f.context) {
                Some(Context::Call(call)) => call.input(key).is_some(),
                _ => false,
            },
            Production::RuntimeKv { key, .. } => match self.owner() {
                Some(Context::Task(task)) => task.runtime.contains_key(key),
                _ => false,
            },
            Production::MetaKv { key, .. } => match self.owner() {
                Some(Context::Task(task)) => task.meta.contains_key(key),
                Some(Context::Workflow(workflow)) => workflow.meta.contains_key(key),
                _ => false,
            },
            Production::ParameterMetaKv { key, .. } => match self.owner() {
                Some(Context::Task(task)) => task.parameter_meta.contains_key(key),
                Some(Context::Workflow(workflow)) => workflow.parameter_meta.contains_key(key),
                _ => false,
            },
            _ => false,
        };
        match production {
            Production::CallInput { key, .. }
            | Production::RuntimeKv { key, .. }
            | Production::MetaKv { key, .. }
            | Production::ParameterMetaKv { key, .. }
                if present =>
            {
                Some(key.clone())
            }
            _ => None,
        }
    }

    fn open(&mut self, production: &Production, span: Span) {
        let (node, context) = match self.open_context(production, span) {
            Ok(opened) => opened,
            Err(err) => {
                self.errors.append(err);
                (None, Context::Rejected)
            }
        };
        log::debug!("enter {} at {}", production, span);
        self.stack.push(Frame {
            production: production.name(),
            start: span.start,
            node,
            context,
        });
    }

    fn open_context(
        &mut self,
        production: &Production,
        span: Span,
    ) -> Result<(Option<NodeId>, Context), WdlError> {
        let Some(parent) = self.attach_target() else {
            return Ok((None, Context::Rejected));
        };
        if matches!(production, Production::CommandPlaceholder { .. }) {
            return Ok((None, Context::CommandPlaceholder));
        }
        let pos = self.position(span);
        let kind = node_kind(production).ok_or_else(|| WdlError::MismatchContext {
            pos: pos.clone(),
            expected: "section".to_string(),
            found: production.name().to_string(),
        })?;
        self.document.ast.check_attach(parent, kind, &pos)?;

        if let Some(key) = self.duplicate_key(production) {
            if self.options.report_duplicate_keys {
                return Err(WdlError::Redefinition { pos, name: key });
            }
            log::debug!("dropping duplicate key `{}`", key);
            return Ok((None, Context::Rejected));
        }
        if matches!(production, Production::Command { .. }) {
            let taken = match self.owner() {
                Some(Context::Task(task)) => {
                    task.command_span.is_some() || !task.command.is_empty()
                }
                _ => false,
            };
            if taken {
                return Err(WdlError::Redefinition {
                    pos,
                    name: "command".to_string(),
                });
            }
        }

        let node = self.document.ast.new_node(kind, span);
        let scopes = &mut self.document.scopes;
        let context = match production {
            Production::Import { uri } => Context::Import(Import::new(node, span, uri)),
            Production::Struct { name } => {
                Context::Struct(StructDef::new(node, span, name, scopes.new_scope(node)))
            }
            Production::Workflow { name } => {
                Context::Workflow(Workflow::new(node, span, name, scopes.new_scope(node)))
            }
            Production::Task { name } => {
                Context::Task(Task::new(node, span, name, scopes.new_scope(node)))
            }
            Production::InputBlock
            | Production::OutputBlock
            | Production::MetaBlock
            | Production::ParameterMetaBlock
            | Production::RuntimeBlock => Context::Block(kind),
            Production::Declaration {
                identifier,
                declared_type,
            } => Context::Declaration(Decl::new(node, span, identifier, declared_type)),
            Production::Call {
                target,
                alias,
                after,
            } => {
                let mut call = Call::new(node, span, target);
                call.alias = alias.clone().unwrap_or_default();
                call.after = after.first().cloned().unwrap_or_default();
                call.afters = after.clone();
                Context::Call(call)
            }
            Production::CallInput { key, .. } => {
                Context::Entry(KeyValue::new(node, span, key, ""), EntryKind::CallInput)
            }
            Production::RuntimeKv { key, .. } => {
                Context::Entry(KeyValue::new(node, span, key, ""), EntryKind::Runtime)
            }
            Production::MetaKv { key, .. } => {
                Context::Entry(KeyValue::new(node, span, key, ""), EntryKind::Meta)
            }
            Production::ParameterMetaKv { key, .. } => {
                Context::Entry(KeyValue::new(node, span, key, ""), EntryKind::ParameterMeta)
            }
            Production::Command { .. } => Context::Command,
            Production::Scatter { variable } => Context::Section(WorkflowSection {
                id: node,
                span,
                kind: SectionKind::Scatter,
                variable: Some(variable.clone()),
                expression: None,
            }),
            _ => Context::Section(WorkflowSection {
                id: node,
                span,
                kind: SectionKind::Conditional,
                variable: None,
                expression: None,
            }),
        };
        Ok((Some(node), context))
    }

    /// Close the innermost section opened by `production`.
    ///
    /// Sections opened after it are closed first, with an error for each; an
    /// exit that matches no open section is reported and ignored.
    fn exit_section(&mut self, production: &Production, span: Span) {
        let name = production.name();
        if self.compiler.is_active() {
            self.errors.append(WdlError::MismatchContext {
                pos: self.position(span),
                expected: "expression".to_string(),
                found: name.to_string(),
            });
            self.compiler.reset();
        }
        let Some(index) = self.stack.iter().rposition(|f| f.production == name) else {
            let expected = self
                .stack
                .last()
                .map(|f| f.production)
                .unwrap_or("document");
            self.errors.append(WdlError::MismatchContext {
                pos: self.position(span),
                expected: expected.to_string(),
                found: name.to_string(),
            });
            return;
        };
        while self.stack.len() > index + 1 {
            let Some(frame) = self.stack.pop() else { break };
            self.errors.append(WdlError::MismatchContext {
                pos: self.position(span),
                expected: frame.production.to_string(),
                found: name.to_string(),
            });
            let unwound = Span::new(frame.start, span.end.max(frame.start));
            self.close(frame, unwound, None);
        }
        if let Some(frame) = self.stack.pop() {
            log::debug!("exit {} at {}", production, span);
            self.close(frame, span, Some(production));
        }
    }

    /// The symbol a closing section binds, and the scope it binds in.
    fn symbol_of(&self, context: &Context, node: NodeId, span: Span) -> Option<(ScopeId, Symbol)> {
        let root = self.document.scope;
        let symbol = match context {
            Context::Import(import) => (
                root,
                Symbol::new(import.namespace(), SymbolKind::Import, node, span),
            ),
            Context::Struct(def) => (
                root,
                Symbol::new(&def.name, SymbolKind::Struct, node, span).with_scope(def.scope),
            ),
            Context::Workflow(workflow) => (
                root,
                Symbol::new(&workflow.name, SymbolKind::Workflow, node, span)
                    .with_scope(workflow.scope),
            ),
            Context::Task(task) => (
                root,
                Symbol::new(&task.name, SymbolKind::Task, node, span).with_scope(task.scope),
            ),
            Context::Declaration(decl) => (
                self.current_scope(),
                Symbol::new(&decl.identifier, SymbolKind::Declaration, node, span),
            ),
            Context::Call(call) => (
                self.current_scope(),
                Symbol::new(call.name(), SymbolKind::Call, node, span),
            ),
            _ => return None,
        };
        Some(symbol)
    }

    fn close(&mut self, frame: Frame, span: Span, payload: Option<&Production>) {
        let Frame { node, context, .. } = frame;
        if matches!(context, Context::Rejected) {
            return;
        }
        let pos = self.position(span);

        if let Some(node) = node {
            self.document.ast.set_span(node, span);
            if let Some((scope, symbol)) = self.symbol_of(&context, node, span) {
                let opened = symbol.scope;
                if let Err(err) = self.document.scopes.define(scope, symbol) {
                    self.errors.append(err.at(pos));
                    return;
                }
                if let Some(opened) = opened {
                    self.document.scopes.push_child(scope, opened);
                }
            }
            let parent = self.attach_target().unwrap_or(self.document.id);
            match self.document.ast.attach_child(parent, node, &pos) {
                Ok(Attached::New) => {}
                Ok(Attached::Duplicate(existing)) => {
                    log::debug!("{} duplicates {}", node, existing);
                    return;
                }
                Err(err) => {
                    self.errors.append(err);
                    return;
                }
            }
            let raw = self.map.slice(self.source, span).to_string();
            let in_body = matches!(
                self.stack.last().map(|f| &f.context),
                Some(Context::Workflow(_) | Context::Task(_))
            );
            if in_body {
                match self.owner_mut() {
                    Some(Context::Workflow(w)) => w.raw_elements.push(raw),
                    Some(Context::Task(t)) => t.raw_elements.push(raw),
                    _ => {}
                }
            }
        }

        match context {
            Context::Import(mut import) => {
                import.span = span;
                self.document.imports.push(import);
            }
            Context::Struct(mut def) => {
                def.span = span;
                self.document.structs.push(def);
            }
            Context::Workflow(mut workflow) => {
                workflow.span = span;
                self.document.workflow = Some(workflow);
            }
            Context::Task(mut task) => {
                task.span = span;
                self.document.tasks.push(task);
            }
            Context::Declaration(mut decl) => {
                decl.span = span;
                let section = match self.stack.last().map(|f| &f.context) {
                    Some(Context::Block(NodeKind::InputBlock)) => DeclSection::Input,
                    Some(Context::Block(NodeKind::OutputBlock)) => DeclSection::Output,
                    _ => DeclSection::Private,
                };
                match self.owner_mut().and_then(|owner| decl_list(owner, section)) {
                    Some(list) => list.push(decl),
                    None => log::debug!("declaration `{}` has no owner", decl.identifier),
                }
            }
            Context::Call(mut call) => {
                call.span = span;
                match self.workflow_mut() {
                    Some(workflow) => workflow.calls.push(call),
                    None => log::debug!("call `{}` outside a workflow", call.target),
                }
            }
            Context::Entry(mut kv, kind) => {
                kv.span = span;
                kv.value = match payload {
                    Some(
                        Production::CallInput { value_text, .. }
                        | Production::RuntimeKv { value_text, .. }
                        | Production::MetaKv { value_text, .. }
                        | Production::ParameterMetaKv { value_text, .. },
                    ) => value_text.clone(),
                    _ => String::new(),
                };
                self.add_entry(kv, kind);
            }
            Context::Command => {
                if let Some(Production::Command { content }) = payload {
                    if let Some(task) = self.task_mut() {
                        task.command_span = *content;
                    }
                }
            }
            Context::CommandPlaceholder => {
                if let Some(Production::CommandPlaceholder { text }) = payload {
                    let text = text.clone();
                    if let Some(task) = self.task_mut() {
                        task.command.push(text);
                    }
                }
            }
            Context::Section(mut section) => {
                section.span = span;
                if let Some(workflow) = self.workflow_mut() {
                    insert_in_source_order(&mut workflow.sections, section);
                }
            }
            Context::Block(_) | Context::Rejected => {}
        }
    }

    fn add_entry(&mut self, kv: KeyValue, kind: EntryKind) {
        match kind {
            EntryKind::CallInput => {
                if let Some(Context::Call(call)) = self.stack.last_mut().map(|f| &mut f.context) {
                    call.inputs.push(kv);
                }
            }
            EntryKind::Runtime => {
                if let Some(task) = self.task_mut() {
                    task.runtime.entry(kv.key.clone()).or_insert(kv);
                }
            }
            EntryKind::Meta | EntryKind::ParameterMeta => {
                let maps = match self.owner_mut() {
                    Some(Context::Workflow(w)) => Some((&mut w.meta, &mut w.parameter_meta)),
                    Some(Context::Task(t)) => Some((&mut t.meta, &mut t.parameter_meta)),
                    _ => None,
                };
                if let Some((meta, parameter_meta)) = maps {
                    let map = if kind == EntryKind::Meta {
                        meta
                    } else {
                        parameter_meta
                    };
                    map.entry(kv.key).or_insert(kv.value);
                }
            }
        }
    }

    fn enter_expression(&mut self, production: &Production, span: Span) {
        match production {
            Production::Expression => self.compiler.enter_expression(&mut self.document.ast, span),
            Production::StringLiteral => self.compiler.enter_string(),
            _ => {}
        }
    }

    fn exit_expression(&mut self, production: &Production, span: Span) {
        let result = match production {
            Production::Expression => {
                let pos = self.position(span);
                match self.compiler.exit_expression(&mut self.document.ast, span, &pos) {
                    Ok(Some(expr)) => {
                        self.finish_expression(expr, pos);
                        Ok(())
                    }
                    Ok(None) => Ok(()),
                    Err(err) => Err(err),
                }
            }
            Production::Literal { class, text } => self.compiler.literal(*class, text),
            Production::Identifier { name } => self.compiler.identifier(name),
            Production::MemberAccess { member } => self.compiler.member_access(member),
            Production::Infix { op } => self.compiler.infix(*op),
            Production::UnarySign { negative } => self.compiler.unary_sign(*negative),
            Production::LogicalNot => self.compiler.logical_not(),
            Production::Group => self.compiler.group(),
            Production::Ternary => self.compiler.ternary(),
            Production::StringLiteral => self.compiler.exit_string(),
            Production::StringPart { text } => self.compiler.string_part(text),
            Production::Placeholder => self.compiler.placeholder(),
            Production::Opaque { text } => self.compiler.opaque(text),
            _ => Ok(()),
        };
        if let Err(err) = result {
            log::debug!("{} at {}: {}", production, span, err);
        }
    }

    /// Hand a finished outermost expression to the open section.
    fn finish_expression(&mut self, expr: Expression, pos: SourcePosition) {
        let Some(target) = self.attach_target() else {
            log::trace!("dropping {} inside a rejected section", expr.id);
            return;
        };
        match self.document.ast.attach_child(target, expr.id, &pos) {
            Ok(Attached::New) => {}
            Ok(Attached::Duplicate(_)) => return,
            Err(err) => {
                self.errors.append(err);
                return;
            }
        }
        let in_placeholder = matches!(
            self.stack.last().map(|f| &f.context),
            Some(Context::CommandPlaceholder)
        );
        if in_placeholder {
            if let Some(task) = self.task_mut() {
                task.command_placeholders.push(expr);
            }
            return;
        }
        match self.stack.last_mut().map(|f| &mut f.context) {
            Some(Context::Declaration(decl)) => decl.initializer = Some(expr),
            Some(Context::Entry(kv, _)) => kv.expression = Some(expr),
            Some(Context::Section(section)) => section.expression = Some(expr),
            _ => log::debug!("expression {} has no holder", expr.id),
        }
    }

    fn leaf(&mut self, production: &Production, span: Span) {
        match production {
            Production::Version { text } => self.document.version = text.clone(),
            Production::ImportAs { identifier } => {
                match self.stack.last_mut().map(|f| &mut f.context) {
                    Some(Context::Import(import)) => import.alias = identifier.clone(),
                    Some(Context::Rejected) => {}
                    _ => self.misplaced(production, "import_doc", span),
                }
            }
            Production::ImportAlias { original, alias } => {
                match self.stack.last_mut().map(|f| &mut f.context) {
                    Some(Context::Import(import)) => {
                        import
                            .struct_aliases
                            .entry(original.clone())
                            .or_insert_with(|| alias.clone());
                    }
                    Some(Context::Rejected) => {}
                    _ => self.misplaced(production, "import_doc", span),
                }
            }
            Production::CommandPart { text } => {
                if let Some(Context::Command) = self.stack.last().map(|f| &f.context) {
                    let text = text.clone();
                    if let Some(task) = self.task_mut() {
                        task.command.push(text);
                    }
                }
            }
            _ => {}
        }
    }

    fn misplaced(&mut self, production: &Production, expected: &str, span: Span) {
        self.errors.append(WdlError::MismatchContext {
            pos: self.position(span),
            expected: expected.to_string(),
            found: production.name().to_string(),
        });
    }

    /// Give each call of a local task the task's scope, so `call.input` resolves.
    fn link_calls(&mut self) {
        let Some(workflow) = &self.document.workflow else {
            return;
        };
        let links: Vec<(String, ScopeId)> = workflow
            .calls
            .iter()
            .filter(|call| !call.target.contains('.'))
            .filter_map(|call| {
                self.document
                    .task(&call.target)
                    .map(|task| (call.name().to_string(), task.scope))
            })
            .collect();
        let scope = workflow.scope;
        for (name, task_scope) in links {
            self.document.scopes.link_symbol(scope, &name, task_scope);
        }
    }
}

fn is_leaf(production: &Production) -> bool {
    matches!(
        production,
        Production::Version { .. }
            | Production::ImportAs { .. }
            | Production::ImportAlias { .. }
            | Production::CommandPart { .. }
    )
}

impl ParseTreeListener for AstBuilder<'_> {
    fn enter(&mut self, production: &Production, span: Span) {
        if production.is_expression() {
            self.enter_expression(production, span);
        } else if !is_leaf(production) {
            self.open(production, span);
        }
    }

    fn exit(&mut self, production: &Production, span: Span) {
        if production.is_expression() {
            self.exit_expression(production, span);
        } else if is_leaf(production) {
            self.leaf(production, span);
        } else {
            self.exit_section(production, span);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::parser::document::parse_document;
    use crate::parser::events::Walker;
    use pretty_assertions::assert_eq;

    fn build_with(source: &str, options: ParseOptions) -> (Document, Vec<WdlError>) {
        let mut builder = AstBuilder::new(source, "test.wdl", options);
        {
            let mut walker = Walker::new(source, "test.wdl", &mut builder);
            parse_document(&mut walker);
        }
        builder.finish()
    }

    fn build(source: &str) -> (Document, Vec<WdlError>) {
        build_with(source, ParseOptions::default())
    }

    fn kinds(errors: &[WdlError]) -> Vec<ErrorKind> {
        errors.iter().map(|e| e.kind()).collect()
    }

    #[test]
    fn test_version_and_workflow() {
        let (doc, errors) = build("version 1.1 workflow T {}");
        assert!(errors.is_empty());
        assert_eq!(doc.version, "1.1");
        let workflow = doc.workflow.as_ref().unwrap();
        assert_eq!(workflow.name, "T");
        assert_eq!(workflow.span, Span::new(12, 24));
        assert_eq!(doc.ast.parent(workflow.id), Some(doc.id));
        assert!(doc.scopes.resolve(doc.scope, "T").is_ok());
    }

    #[test]
    fn test_redefined_declaration_is_dropped() {
        let source =
            "version 1.1\nworkflow w {\n  input {\n    Int x\n  }\n  Int x = 1\n  Int y = 2\n}";
        let (doc, errors) = build(source);
        assert_eq!(kinds(&errors), vec![ErrorKind::Redefinition]);
        assert_eq!(errors[0].source_position().map(|p| p.line), Some(6));
        let workflow = doc.workflow.unwrap();
        assert_eq!(workflow.inputs.len(), 1);
        let privates: Vec<_> = workflow
            .private_decls
            .iter()
            .map(|d| d.identifier.as_str())
            .collect();
        assert_eq!(privates, vec!["y"]);
    }

    #[test]
    fn test_duplicate_meta_key_first_wins() {
        let source =
            "version 1.1\ntask t {\n  meta {\n    a: \"1\"\n    a: \"2\"\n    b: 3\n  }\n}";
        let (doc, errors) = build(source);
        assert_eq!(kinds(&errors), vec![ErrorKind::Redefinition]);
        let task = &doc.tasks[0];
        assert_eq!(task.meta.get("a").map(String::as_str), Some("\"1\""));
        assert_eq!(task.meta.get("b").map(String::as_str), Some("3"));

        let quiet = ParseOptions {
            report_duplicate_keys: false,
            ..ParseOptions::default()
        };
        let (doc, errors) = build_with(source, quiet);
        assert!(errors.is_empty());
        assert_eq!(doc.tasks[0].meta.len(), 2);
    }

    #[test]
    fn test_second_workflow_rejected() {
        let (doc, errors) = build("version 1.1\nworkflow a {}\nworkflow b {}");
        assert_eq!(kinds(&errors), vec![ErrorKind::KindMismatch]);
        assert_eq!(doc.workflow.unwrap().name, "a");
    }

    #[test]
    fn test_duplicate_task_name() {
        let (doc, errors) = build("version 1.1\ntask t {}\ntask t { Int x = 1 }");
        assert_eq!(kinds(&errors), vec![ErrorKind::Redefinition]);
        assert_eq!(doc.tasks.len(), 1);
        assert!(doc.tasks[0].private_decls.is_empty());
    }

    #[test]
    fn test_scatter_and_conditional_are_flattened() {
        let source =
            "version 1.1\nworkflow w {\n  input { Array[String] samples }\n  scatter (s in samples) {\n    if (s != \"\") {\n      call align { input: sample = s }\n    }\n    Int n = 1\n  }\n}";
        let (doc, errors) = build(source);
        assert!(errors.is_empty(), "{:?}", errors);
        let workflow = doc.workflow.unwrap();
        assert_eq!(workflow.calls.len(), 1);
        assert_eq!(workflow.calls[0].input("sample").unwrap().value, "s");
        assert_eq!(workflow.private_decls[0].identifier, "n");

        let kinds: Vec<_> = workflow.sections.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SectionKind::Scatter, SectionKind::Conditional]);
        assert_eq!(workflow.sections[0].variable.as_deref(), Some("s"));
        assert_eq!(
            workflow.sections[0].expression.as_ref().unwrap().to_string(),
            "[samples]"
        );
        assert_eq!(
            workflow.sections[1].expression.as_ref().unwrap().to_string(),
            "[s, \"\", neq]"
        );
        let scatter = workflow.sections[0].id;
        assert_eq!(doc.ast.parent(workflow.sections[1].id), Some(scatter));
    }

    #[test]
    fn test_command_parts_and_placeholders() {
        let source =
            "version 1.1\ntask hello {\n  input { String name }\n  command <<<\n    echo \"Hello ~{name}\"\n  >>>\n}";
        let (doc, errors) = build(source);
        assert!(errors.is_empty());
        let task = &doc.tasks[0];
        assert_eq!(
            task.command,
            vec!["\n    echo \"Hello ", "~{name}", "\"\n  "]
        );
        let map = SourceMap::new("test.wdl", source);
        assert_eq!(map.slice(source, task.command_span.unwrap()), task.command_text());
        assert_eq!(task.command_placeholders.len(), 1);
        assert_eq!(task.command_placeholders[0].to_string(), "[name]");
    }

    #[test]
    fn test_call_resolves_into_task_scope() {
        let source =
            "version 1.1\ntask Greeting {\n  input { String name }\n  command {}\n}\nworkflow w {\n  call Greeting as hello { input: name = \"x\" }\n}";
        let (doc, errors) = build(source);
        assert!(errors.is_empty());
        let workflow = doc.workflow.as_ref().unwrap();
        let symbol = doc
            .scopes
            .resolve_dotted(workflow.scope, &["hello", "name"])
            .unwrap();
        assert_eq!(symbol.kind, SymbolKind::Declaration);
        assert_eq!(doc.declaration(symbol.node).unwrap().declared_type, "String");
    }

    #[test]
    fn test_raw_elements_and_runtime() {
        let source =
            "version 1.1\ntask t {\n  Int x = 1\n  runtime {\n    docker: \"ubuntu\"\n    docker: \"alpine\"\n  }\n}";
        let (doc, errors) = build(source);
        assert_eq!(kinds(&errors), vec![ErrorKind::Redefinition]);
        let task = &doc.tasks[0];
        assert_eq!(task.raw_elements[0], "Int x = 1");
        assert!(task.raw_elements[1].starts_with("runtime {"));
        assert_eq!(task.runtime_value("docker"), Some("\"ubuntu\""));
        let docker = task.runtime.get("docker").unwrap();
        assert_eq!(docker.expression.as_ref().unwrap().to_string(), "[\"ubuntu\"]");
    }

    #[test]
    fn test_struct_members_in_struct_scope() {
        let (doc, errors) = build("version 1.1\nstruct Sample {\n  String id\n  File? reads\n}");
        assert!(errors.is_empty());
        let def = doc.struct_def("Sample").unwrap();
        let members: Vec<_> = def.members.iter().map(|m| m.declared_type.as_str()).collect();
        assert_eq!(members, vec!["String", "File?"]);
        assert!(doc.scopes.resolve_dotted(doc.scope, &["Sample", "reads"]).is_ok());
        assert!(doc.scopes.resolve(doc.scope, "reads").is_err());
    }

    #[test]
    fn test_unmatched_exit_unwinds() {
        let source = "workflow w { input {} }";
        let mut builder = AstBuilder::new(source, "test.wdl", ParseOptions::default());
        let workflow = Production::Workflow {
            name: "w".to_string(),
        };
        builder.enter(&workflow, Span::new(0, 0));
        builder.enter(&Production::InputBlock, Span::new(13, 13));
        builder.exit(&workflow, Span::new(0, 22));
        builder.exit(&Production::Task { name: "t".to_string() }, Span::new(0, 22));
        let (doc, errors) = builder.finish();

        assert_eq!(
            kinds(&errors),
            vec![ErrorKind::MismatchContext, ErrorKind::MismatchContext]
        );
        let workflow = doc.workflow.unwrap();
        assert_eq!(workflow.span, Span::new(0, 22));
        let children = doc.ast.children(workflow.id);
        assert_eq!(children.len(), 1);
        assert_eq!(doc.ast.span(children[0]), Some(Span::new(13, 22)));
    }

    #[test]
    fn test_kind_mismatch_drops_child() {
        let source = "task t { call x }";
        let mut builder = AstBuilder::new(source, "test.wdl", ParseOptions::default());
        let task = Production::Task {
            name: "t".to_string(),
        };
        let call = Production::Call {
            target: "x".to_string(),
            alias: None,
            after: vec![],
        };
        builder.enter(&task, Span::new(0, 0));
        builder.enter(&call, Span::new(9, 9));
        builder.exit(&call, Span::new(9, 14));
        builder.exit(&task, Span::new(0, 16));
        let (doc, errors) = builder.finish();

        assert_eq!(kinds(&errors), vec![ErrorKind::KindMismatch]);
        assert_eq!(doc.tasks.len(), 1);
        assert!(doc.ast.children(doc.tasks[0].id).is_empty());
    }
}
