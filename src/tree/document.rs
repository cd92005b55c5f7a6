//! Typed document nodes
//!
//! Each typed node mirrors one arena node in [`Ast`] (same [`NodeId`] and span)
//! and keeps its children in per-kind lists rather than a heterogeneous list.

use super::{Ast, NodeId, SourceNode, Span};
use crate::expr::Expression;
use crate::scope::{ScopeId, ScopeTree};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

/// Root of a parsed WDL document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: NodeId,
    pub span: Span,
    /// Path or label the source was read from
    pub path: String,
    /// Text following the `version` keyword; empty when absent
    pub version: String,
    pub imports: Vec<Import>,
    pub workflow: Option<Workflow>,
    pub tasks: Vec<Task>,
    pub structs: Vec<StructDef>,
    /// The document (root) scope
    pub scope: ScopeId,
    #[serde(skip_serializing)]
    pub ast: Ast,
    #[serde(skip_serializing)]
    pub scopes: ScopeTree,
}

impl Document {
    pub fn new(path: &str, size: usize) -> Self {
        let mut ast = Ast::new();
        let id = ast.new_document(size);
        let span = ast.span(id).unwrap_or(Span::new(0, 0));
        let scopes = ScopeTree::new(id);
        let scope = scopes.root();
        Self {
            id,
            span,
            path: path.to_string(),
            version: String::new(),
            imports: Vec::new(),
            workflow: None,
            tasks: Vec::new(),
            structs: Vec::new(),
            scope,
            ast,
            scopes,
        }
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn struct_def(&self, name: &str) -> Option<&StructDef> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn import(&self, namespace: &str) -> Option<&Import> {
        self.imports.iter().find(|i| i.namespace() == namespace)
    }

    /// The scope owned by the workflow or task called `name`.
    pub fn section_scope(&self, name: &str) -> Option<ScopeId> {
        if let Some(workflow) = self.workflow.as_ref().filter(|w| w.name == name) {
            return Some(workflow.scope);
        }
        self.task(name).map(|t| t.scope)
    }

    /// Every declaration in the document, in source order per section.
    pub fn declarations(&self) -> Vec<&Decl> {
        let mut decls = Vec::new();
        for def in &self.structs {
            decls.extend(def.members.iter());
        }
        if let Some(workflow) = &self.workflow {
            decls.extend(workflow.declarations());
        }
        for task in &self.tasks {
            decls.extend(task.declarations());
        }
        decls
    }

    /// Find a declaration by its node id.
    pub fn declaration(&self, id: NodeId) -> Option<&Decl> {
        self.declarations().into_iter().find(|d| d.id == id)
    }

    /// Every top-level compiled expression of the document.
    pub fn expressions(&self) -> Vec<&Expression> {
        let mut exprs: Vec<&Expression> = self
            .declarations()
            .into_iter()
            .filter_map(|d| d.initializer.as_ref())
            .collect();
        if let Some(workflow) = &self.workflow {
            exprs.extend(workflow.sections.iter().filter_map(|s| s.expression.as_ref()));
            for call in &workflow.calls {
                exprs.extend(call.inputs.iter().filter_map(|kv| kv.expression.as_ref()));
            }
        }
        for task in &self.tasks {
            exprs.extend(task.command_placeholders.iter());
            exprs.extend(task.runtime.values().filter_map(|kv| kv.expression.as_ref()));
        }
        exprs
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.ast.parent(id)
    }
}

/// Derive the default import name from a URI: its last path segment, without `.wdl`.
pub fn import_name(uri: &str) -> String {
    let segment = match Url::parse(uri) {
        Ok(url) if !url.cannot_be_a_base() => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or_default()
            .to_string(),
        _ => uri
            .trim_end_matches('/')
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(uri)
            .to_string(),
    };
    segment
        .strip_suffix(".wdl")
        .unwrap_or(&segment)
        .to_string()
}

/// `import "uri" [as alias] [alias A as B]*`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub id: NodeId,
    pub span: Span,
    /// The URI as written, without quotes
    pub uri: String,
    pub name: String,
    /// Namespace given with `as`; empty when absent
    pub alias: String,
    /// Struct renames, original name to local name
    pub struct_aliases: IndexMap<String, String>,
}

impl Import {
    pub fn new(id: NodeId, span: Span, uri: &str) -> Self {
        Self {
            id,
            span,
            uri: uri.to_string(),
            name: import_name(uri),
            alias: String::new(),
            struct_aliases: IndexMap::new(),
        }
    }

    /// Namespace under which the imported document's members are visible
    pub fn namespace(&self) -> &str {
        if self.alias.is_empty() {
            &self.name
        } else {
            &self.alias
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub scope: ScopeId,
    pub inputs: Vec<Decl>,
    pub private_decls: Vec<Decl>,
    pub outputs: Vec<Decl>,
    /// Calls in source order, including those nested in scatter/if sections
    pub calls: Vec<Call>,
    pub sections: Vec<WorkflowSection>,
    pub meta: IndexMap<String, String>,
    pub parameter_meta: IndexMap<String, String>,
    /// Source text of each top-level workflow element
    pub raw_elements: Vec<String>,
}

impl Workflow {
    pub fn new(id: NodeId, span: Span, name: &str, scope: ScopeId) -> Self {
        Self {
            id,
            span,
            name: name.to_string(),
            scope,
            inputs: Vec::new(),
            private_decls: Vec::new(),
            outputs: Vec::new(),
            calls: Vec::new(),
            sections: Vec::new(),
            meta: IndexMap::new(),
            parameter_meta: IndexMap::new(),
            raw_elements: Vec::new(),
        }
    }

    pub fn declarations(&self) -> impl Iterator<Item = &Decl> {
        self.inputs
            .iter()
            .chain(self.private_decls.iter())
            .chain(self.outputs.iter())
    }

    pub fn call(&self, name: &str) -> Option<&Call> {
        self.calls.iter().find(|c| c.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub scope: ScopeId,
    pub inputs: Vec<Decl>,
    pub private_decls: Vec<Decl>,
    pub outputs: Vec<Decl>,
    /// Literal command text alternating with placeholder source text
    pub command: Vec<String>,
    /// Span of the command template between its delimiters
    pub command_span: Option<Span>,
    /// Compiled placeholder expressions, in command order
    pub command_placeholders: Vec<Expression>,
    pub runtime: IndexMap<String, KeyValue>,
    pub meta: IndexMap<String, String>,
    pub parameter_meta: IndexMap<String, String>,
    pub raw_elements: Vec<String>,
}

impl Task {
    pub fn new(id: NodeId, span: Span, name: &str, scope: ScopeId) -> Self {
        Self {
            id,
            span,
            name: name.to_string(),
            scope,
            inputs: Vec::new(),
            private_decls: Vec::new(),
            outputs: Vec::new(),
            command: Vec::new(),
            command_span: None,
            command_placeholders: Vec::new(),
            runtime: IndexMap::new(),
            meta: IndexMap::new(),
            parameter_meta: IndexMap::new(),
            raw_elements: Vec::new(),
        }
    }

    pub fn declarations(&self) -> impl Iterator<Item = &Decl> {
        self.inputs
            .iter()
            .chain(self.private_decls.iter())
            .chain(self.outputs.iter())
    }

    /// The command template as written.
    pub fn command_text(&self) -> String {
        self.command.concat()
    }

    /// Raw runtime value for `key`.
    pub fn runtime_value(&self, key: &str) -> Option<&str> {
        self.runtime.get(key).map(|kv| kv.value.as_str())
    }
}

/// `call target [as alias] [after other]* [{ input: ... }]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub id: NodeId,
    pub span: Span,
    /// Called task or workflow, possibly `namespace.name`
    pub target: String,
    pub alias: String,
    /// First `after` clause; empty when absent
    pub after: String,
    /// All `after` clauses in order
    pub afters: Vec<String>,
    pub inputs: Vec<KeyValue>,
}

impl Call {
    pub fn new(id: NodeId, span: Span, target: &str) -> Self {
        Self {
            id,
            span,
            target: target.to_string(),
            alias: String::new(),
            after: String::new(),
            afters: Vec::new(),
            inputs: Vec::new(),
        }
    }

    /// Name the call is known by in the workflow: the alias, else the last target segment.
    pub fn name(&self) -> &str {
        if !self.alias.is_empty() {
            return &self.alias;
        }
        self.target.rsplit('.').next().unwrap_or(&self.target)
    }

    pub fn input(&self, key: &str) -> Option<&KeyValue> {
        self.inputs.iter().find(|kv| kv.key == key)
    }
}

/// Typed name binding: `Type name [= expr]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decl {
    pub id: NodeId,
    pub span: Span,
    pub identifier: String,
    /// Surface type text with whitespace removed, e.g. `Array[File]+?`
    pub declared_type: String,
    pub initializer: Option<Expression>,
}

impl Decl {
    pub fn new(id: NodeId, span: Span, identifier: &str, declared_type: &str) -> Self {
        Self {
            id,
            span,
            identifier: identifier.to_string(),
            declared_type: declared_type.to_string(),
            initializer: None,
        }
    }

    pub fn is_optional(&self) -> bool {
        self.declared_type.ends_with('?')
    }
}

/// Key with its right-hand side as written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub id: NodeId,
    pub span: Span,
    pub key: String,
    /// Raw source of the value, quotes included
    pub value: String,
    /// Compiled value, for call inputs and runtime entries
    pub expression: Option<Expression>,
}

impl KeyValue {
    pub fn new(id: NodeId, span: Span, key: &str, value: &str) -> Self {
        Self {
            id,
            span,
            key: key.to_string(),
            value: value.to_string(),
            expression: None,
        }
    }
}

/// `struct Name { members }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub scope: ScopeId,
    pub members: Vec<Decl>,
}

impl StructDef {
    pub fn new(id: NodeId, span: Span, name: &str, scope: ScopeId) -> Self {
        Self {
            id,
            span,
            name: name.to_string(),
            scope,
            members: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Scatter,
    Conditional,
}

/// A `scatter` or `if` block inside a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSection {
    pub id: NodeId,
    pub span: Span,
    pub kind: SectionKind,
    /// Scatter variable; `None` for conditionals
    pub variable: Option<String>,
    /// The scatter collection or the condition
    pub expression: Option<Expression>,
}

macro_rules! impl_source_node {
    ($($ty:ty),*) => {
        $(
            impl SourceNode for $ty {
                fn node_id(&self) -> NodeId {
                    self.id
                }

                fn span(&self) -> Span {
                    self.span
                }
            }
        )*
    };
}

impl_source_node!(
    Document,
    Import,
    Workflow,
    Task,
    Call,
    Decl,
    KeyValue,
    StructDef,
    WorkflowSection,
    Expression
);
