//! Parse-tree events and the walker that emits them.
//!
//! The grammar functions drive a [`Walker`], which turns productions into
//! enter/exit callbacks on a [`ParseTreeListener`]. Every enter is matched by
//! an exit, even when the production fails part way. Enter spans are
//! provisional (the production's start only); exit spans and payloads are
//! final.
//!
//! Events can be held in a buffer while the walker decides how a construct is
//! reported: expression forms the compiler does not model are parsed for
//! syntax, their buffered events dropped, and a single `Opaque` leaf emitted in
//! their place.

use super::token_stream::TokenStream;
use crate::error::{SyntaxError, WdlError};
use crate::expr::{LiteralClass, Operator};
use crate::tree::Span;
use std::fmt;

/// Named grammar productions and their payloads
#[derive(Debug, Clone, PartialEq)]
pub enum Production {
    Version { text: String },
    Import { uri: String },
    ImportAs { identifier: String },
    ImportAlias { original: String, alias: String },
    Struct { name: String },
    Workflow { name: String },
    Task { name: String },
    InputBlock,
    OutputBlock,
    MetaBlock,
    ParameterMetaBlock,
    RuntimeBlock,
    Declaration { identifier: String, declared_type: String },
    Call {
        target: String,
        alias: Option<String>,
        after: Vec<String>,
    },
    CallInput { key: String, value_text: String },
    MetaKv { key: String, value_text: String },
    ParameterMetaKv { key: String, value_text: String },
    RuntimeKv { key: String, value_text: String },
    /// A command block; on exit `content` is the span between its delimiters
    Command { content: Option<Span> },
    CommandPart { text: String },
    /// A command placeholder; `text` is its source including delimiters
    CommandPlaceholder { text: String },
    Scatter { variable: String },
    Conditional,

    Expression,
    Literal { class: LiteralClass, text: String },
    Identifier { name: String },
    MemberAccess { member: String },
    Infix { op: Operator },
    UnarySign { negative: bool },
    LogicalNot,
    Group,
    Ternary,
    StringLiteral,
    StringPart { text: String },
    Placeholder,
    Opaque { text: String },
}

impl Production {
    pub fn name(&self) -> &'static str {
        match self {
            Production::Version { .. } => "version",
            Production::Import { .. } => "import_doc",
            Production::ImportAs { .. } => "import_as",
            Production::ImportAlias { .. } => "import_alias",
            Production::Struct { .. } => "struct",
            Production::Workflow { .. } => "workflow",
            Production::Task { .. } => "task",
            Production::InputBlock => "input_block",
            Production::OutputBlock => "output_block",
            Production::MetaBlock => "meta_block",
            Production::ParameterMetaBlock => "parameter_meta_block",
            Production::RuntimeBlock => "runtime_block",
            Production::Declaration { .. } => "declaration",
            Production::Call { .. } => "call",
            Production::CallInput { .. } => "call_input",
            Production::MetaKv { .. } => "meta_kv",
            Production::ParameterMetaKv { .. } => "parameter_meta_kv",
            Production::RuntimeKv { .. } => "runtime_kv",
            Production::Command { .. } => "command",
            Production::CommandPart { .. } => "command_part",
            Production::CommandPlaceholder { .. } => "command_placeholder",
            Production::Scatter { .. } => "scatter",
            Production::Conditional => "conditional",
            Production::Expression => "expression",
            Production::Literal { .. } => "literal",
            Production::Identifier { .. } => "identifier",
            Production::MemberAccess { .. } => "member_access",
            Production::Infix { .. } => "infix",
            Production::UnarySign { .. } => "unary_sign",
            Production::LogicalNot => "logical_not",
            Production::Group => "group",
            Production::Ternary => "ternary",
            Production::StringLiteral => "string_literal",
            Production::StringPart { .. } => "string_part",
            Production::Placeholder => "placeholder",
            Production::Opaque { .. } => "opaque",
        }
    }

    /// Whether the production belongs to the expression grammar
    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            Production::Expression
                | Production::Literal { .. }
                | Production::Identifier { .. }
                | Production::MemberAccess { .. }
                | Production::Infix { .. }
                | Production::UnarySign { .. }
                | Production::LogicalNot
                | Production::Group
                | Production::Ternary
                | Production::StringLiteral
                | Production::StringPart { .. }
                | Production::Placeholder
                | Production::Opaque { .. }
        )
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receiver of parse-tree events
pub trait ParseTreeListener {
    fn enter(&mut self, production: &Production, span: Span);
    fn exit(&mut self, production: &Production, span: Span);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Enter(Production, Span),
    Exit(Production, Span),
}

/// Grammar driver: the token stream, the event sink, and collected syntax errors.
pub struct Walker<'a, 'l> {
    pub stream: TokenStream<'a>,
    listener: &'l mut dyn ParseTreeListener,
    buffers: Vec<Vec<Event>>,
    errors: Vec<SyntaxError>,
    max_errors: Option<usize>,
    suppressed: usize,
}

impl<'a, 'l> Walker<'a, 'l> {
    pub fn new(source: &'a str, uri: &str, listener: &'l mut dyn ParseTreeListener) -> Self {
        Self {
            stream: TokenStream::new(source, uri),
            listener,
            buffers: Vec::new(),
            errors: Vec::new(),
            max_errors: None,
            suppressed: 0,
        }
    }

    /// Stop recording syntax errors after `max`; the walk itself continues.
    pub fn with_max_errors(mut self, max: Option<usize>) -> Self {
        self.max_errors = max;
        self
    }

    fn emit(&mut self, event: Event) {
        match self.buffers.last_mut() {
            Some(buffer) => buffer.push(event),
            None => match &event {
                Event::Enter(production, span) => self.listener.enter(production, *span),
                Event::Exit(production, span) => self.listener.exit(production, *span),
            },
        }
    }

    /// Emit an enter event for a production starting at byte `start`.
    pub fn enter(&mut self, production: Production, start: usize) {
        let span = self.stream.span(start, start + 1);
        self.emit(Event::Enter(production, Span::new(span.start, span.start)));
    }

    /// Emit the exit event of a production spanning `start` to the last consumed token.
    pub fn exit(&mut self, production: Production, start: usize) {
        let end = self.stream.last_end().max(start);
        let span = self.stream.span(start, end);
        self.emit(Event::Exit(production, span));
    }

    /// Emit an enter/exit pair for a production with no children.
    pub fn leaf(&mut self, production: Production, start: usize) {
        self.enter(production.clone(), start);
        self.exit(production, start);
    }

    /// Run `body` inside `production`; the exit is emitted whatever `body` returns.
    pub fn production<T>(
        &mut self,
        production: Production,
        start: usize,
        body: impl FnOnce(&mut Self) -> Result<T, WdlError>,
    ) -> Result<T, WdlError> {
        self.enter(production.clone(), start);
        let result = body(self);
        self.exit(production, start);
        result
    }

    /// Run `body` with events held back. Returns the body's result and its events;
    /// on error the events are released as they are, keeping enters and exits paired.
    pub fn buffered<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, WdlError>,
    ) -> Result<(T, Vec<Event>), WdlError> {
        self.buffers.push(Vec::new());
        let result = body(self);
        let events = self.buffers.pop().unwrap_or_default();
        match result {
            Ok(value) => Ok((value, events)),
            Err(err) => {
                self.replay(events);
                Err(err)
            }
        }
    }

    /// Release buffered events to the enclosing sink.
    pub fn replay(&mut self, events: Vec<Event>) {
        for event in events {
            self.emit(event);
        }
    }

    /// Record a syntax error.
    pub fn report(&mut self, error: WdlError) {
        let Some(record) = error.to_syntax_error() else {
            log::warn!("{}", error);
            return;
        };
        if self.errors.last() == Some(&record) {
            return;
        }
        if self.max_errors.is_some_and(|max| self.errors.len() >= max) {
            self.suppressed += 1;
            return;
        }
        log::debug!("syntax error {}", record);
        self.errors.push(record);
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Collected syntax errors, and the number dropped past the limit.
    pub fn finish(self) -> (Vec<SyntaxError>, usize) {
        (self.errors, self.suppressed)
    }
}
