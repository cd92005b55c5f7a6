//! WDL Abstract Syntax Tree (AST) for documents, tasks, and workflows
//!
//! The tree is stored in two layers. An [`Ast`] arena records every node's kind,
//! character span, and parent link, and enforces which kinds a parent accepts.
//! The typed nodes in [`document`] (`Document`, `Workflow`, `Task`, ...) hold the
//! semantic content in per-kind lists and refer back into the arena by
//! [`NodeId`]. Both layers are written once, by the listener, during a single
//! walk of the source, and are read-only afterwards.

use crate::error::{SourcePosition, WdlError};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod document;

#[cfg(test)]
mod doc_tests;


pub use document::{
    Call, Decl, Document, Import, KeyValue, SectionKind, StructDef, Task, Workflow,
    WorkflowSection,
};

/// Handle of a node in the [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Character span of a node; both ends are inclusive, zero-based offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Whether `other` lies entirely within this span.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Number of characters covered
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.start, self.end)
    }
}

/// Node kind tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Document,
    Import,
    Struct,
    Workflow,
    Task,
    Call,
    InputBlock,
    OutputBlock,
    RuntimeBlock,
    MetaBlock,
    ParameterMetaBlock,
    Command,
    /// A scatter or conditional section inside a workflow
    Section,
    Declaration,
    KeyValue,
    Expression,
}

impl NodeKind {
    /// Whether a node of this kind may hold a child of kind `child`.
    pub fn accepts(&self, child: NodeKind) -> bool {
        use NodeKind::*;
        match self {
            Document => matches!(child, Import | Workflow | Task | Struct),
            Workflow => matches!(
                child,
                InputBlock
                    | OutputBlock
                    | Declaration
                    | Call
                    | Section
                    | MetaBlock
                    | ParameterMetaBlock
            ),
            Task => matches!(
                child,
                InputBlock
                    | OutputBlock
                    | Declaration
                    | Command
                    | RuntimeBlock
                    | MetaBlock
                    | ParameterMetaBlock
            ),
            Section => matches!(child, Declaration | Call | Section | Expression),
            Struct | InputBlock | OutputBlock => child == Declaration,
            MetaBlock | ParameterMetaBlock | RuntimeBlock | Call => child == KeyValue,
            Command | Declaration | KeyValue | Expression => child == Expression,
            Import => false,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Document => "document",
            NodeKind::Import => "import",
            NodeKind::Struct => "struct",
            NodeKind::Workflow => "workflow",
            NodeKind::Task => "task",
            NodeKind::Call => "call",
            NodeKind::InputBlock => "input block",
            NodeKind::OutputBlock => "output block",
            NodeKind::RuntimeBlock => "runtime block",
            NodeKind::MetaBlock => "meta block",
            NodeKind::ParameterMetaBlock => "parameter_meta block",
            NodeKind::Command => "command",
            NodeKind::Section => "section",
            NodeKind::Declaration => "declaration",
            NodeKind::KeyValue => "key-value",
            NodeKind::Expression => "expression",
        };
        f.write_str(name)
    }
}

/// Arena record of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Outcome of [`Ast::attach_child`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attached {
    /// The child is now linked under the parent
    New,
    /// The parent already holds a child with the same span; that node is returned
    Duplicate(NodeId),
}

/// Arena of AST node headers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ast {
    nodes: Vec<NodeInfo>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an unattached node.
    pub fn new_node(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeInfo {
            kind,
            span,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Allocate the document root spanning a source of `size` characters.
    pub fn new_document(&mut self, size: usize) -> NodeId {
        self.new_node(NodeKind::Document, Span::new(0, size.saturating_sub(1)))
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeInfo> {
        self.nodes.get(id.0)
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(|n| n.kind)
    }

    pub fn span(&self, id: NodeId) -> Option<Span> {
        self.node(id).map(|n| n.span)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Attached children of a node, in insertion order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Number of allocated nodes, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate all nodes reachable from `root`, parents before children.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        out
    }

    /// Reset a node's span. Only meaningful before the node is attached.
    pub fn set_span(&mut self, id: NodeId, span: Span) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.span = span;
        }
    }

    /// Check that `parent` can take a child of `kind` without attaching anything.
    pub fn check_attach(
        &self,
        parent: NodeId,
        kind: NodeKind,
        pos: &SourcePosition,
    ) -> Result<(), WdlError> {
        let parent_kind = self.kind(parent).unwrap_or(NodeKind::Document);
        let workflow_taken = kind == NodeKind::Workflow
            && self
                .children(parent)
                .iter()
                .any(|c| self.kind(*c) == Some(NodeKind::Workflow));
        if !parent_kind.accepts(kind) || workflow_taken {
            return Err(WdlError::KindMismatch {
                pos: pos.clone(),
                parent: parent_kind,
                child: kind,
            });
        }
        Ok(())
    }

    /// Link `child` under `parent`.
    ///
    /// Rejects kinds the parent does not accept and a second workflow on a
    /// document. A child whose span equals that of an existing child is the same
    /// node offered twice; it is not linked again.
    pub fn attach_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        pos: &SourcePosition,
    ) -> Result<Attached, WdlError> {
        let (child_kind, child_span) = match self.node(child) {
            Some(node) => (node.kind, node.span),
            None => return Err(WdlError::malformed(format!("unknown node {}", child))),
        };
        if let Some(existing) = self
            .children(parent)
            .iter()
            .copied()
            .find(|c| *c == child || self.span(*c) == Some(child_span))
        {
            return Ok(Attached::Duplicate(existing));
        }
        self.check_attach(parent, child_kind, pos)?;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(Attached::New)
    }
}

/// Maps character offsets to one-based lines and zero-based columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMap {
    uri: String,
    /// Byte offset of each character; absent for pure ASCII sources
    char_starts: Option<Vec<usize>>,
    /// Character offset at which each line begins
    line_starts: Vec<usize>,
    char_len: usize,
}

impl SourceMap {
    pub fn new(uri: &str, source: &str) -> Self {
        let char_starts = if source.is_ascii() {
            None
        } else {
            Some(source.char_indices().map(|(b, _)| b).collect())
        };
        let mut line_starts = vec![0];
        let mut char_len = 0;
        for (i, c) in source.chars().enumerate() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
            char_len = i + 1;
        }
        Self {
            uri: uri.to_string(),
            char_starts,
            line_starts,
            char_len,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Source length in characters
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// Convert a byte offset into a character offset.
    pub fn char_offset(&self, byte: usize) -> usize {
        match &self.char_starts {
            None => byte,
            Some(starts) => starts.partition_point(|b| *b < byte),
        }
    }

    /// Convert a half-open byte range into an inclusive character span.
    pub fn span_of_bytes(&self, start: usize, end: usize) -> Span {
        let start_char = self.char_offset(start);
        let end_char = self.char_offset(end);
        Span::new(start_char, end_char.saturating_sub(1))
    }

    /// One-based line and zero-based column of a character offset.
    pub fn location(&self, offset: usize) -> (u32, u32) {
        let line = self.line_starts.partition_point(|s| *s <= offset).max(1);
        let column = offset - self.line_starts[line - 1];
        (line as u32, column as u32)
    }

    /// Byte offset of a character offset.
    fn byte_offset(&self, offset: usize, source_len: usize) -> usize {
        match &self.char_starts {
            None => offset.min(source_len),
            Some(starts) => starts.get(offset).copied().unwrap_or(source_len),
        }
    }

    /// The source text covered by an inclusive character span.
    pub fn slice<'s>(&self, source: &'s str, span: Span) -> &'s str {
        let start = self.byte_offset(span.start, source.len());
        let end = self.byte_offset(span.end + 1, source.len()).max(start);
        source.get(start..end).unwrap_or("")
    }

    pub fn position(&self, span: Span) -> SourcePosition {
        let (line, column) = self.location(span.start);
        let (end_line, end_column) = self.location(span.end);
        SourcePosition::new(self.uri.clone(), line, column, end_line, end_column)
    }

    pub fn byte_position(&self, start: usize, end: usize) -> SourcePosition {
        self.position(self.span_of_bytes(start, end))
    }
}

/// Typed nodes that live in the arena.
pub trait SourceNode {
    fn node_id(&self) -> NodeId;
    fn span(&self) -> Span;
}

/// Insert `node` after every node that starts before it.
pub fn insert_in_source_order<N: SourceNode>(nodes: &mut Vec<N>, node: N) {
    let start = node.span().start;
    let at = nodes.partition_point(|n| n.span().start < start);
    nodes.insert(at, node);
}
