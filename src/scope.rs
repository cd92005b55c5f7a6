//! Lexical scopes and symbol resolution.
//!
//! Scopes form a tree mirroring the document's lexical structure: the document
//! scope at the root, one child per workflow, task, and struct. Each scope maps
//! names to [`Symbol`]s; lookup walks from a scope through its ancestors and
//! stops at the document scope. Scopes live in an arena ([`ScopeTree`]) and are
//! addressed by [`ScopeId`].

use crate::error::{SourcePosition, WdlError};
use crate::tree::{NodeId, Span};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a scope in a [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Declaration,
    Workflow,
    Task,
    Struct,
    Import,
    Call,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::Declaration => "declaration",
            SymbolKind::Workflow => "workflow",
            SymbolKind::Task => "task",
            SymbolKind::Struct => "struct",
            SymbolKind::Import => "import",
            SymbolKind::Call => "call",
        };
        f.write_str(name)
    }
}

/// A named binding to the AST node that declares it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// The declaring node
    pub node: NodeId,
    pub span: Span,
    /// The scope this symbol opens, used to resolve later segments of a dotted name
    pub scope: Option<ScopeId>,
}

impl Symbol {
    pub fn new(name: &str, kind: SymbolKind, node: NodeId, span: Span) -> Self {
        Self {
            name: name.to_string(),
            kind,
            node,
            span,
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: ScopeId) -> Self {
        self.scope = Some(scope);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub symbols: IndexMap<String, Symbol>,
    /// The AST node that introduced this scope
    pub owner: NodeId,
}

/// Failure of a scope operation, before a source position is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    EmptyName,
    Redefinition { name: String },
    Unresolved { name: String },
}

impl ScopeError {
    /// Attach the position of the offending construct.
    pub fn at(self, pos: SourcePosition) -> WdlError {
        match self {
            ScopeError::EmptyName => WdlError::EmptyName { pos },
            ScopeError::Redefinition { name } => WdlError::Redefinition { pos, name },
            ScopeError::Unresolved { name } => WdlError::Unresolved { name },
        }
    }
}

impl From<ScopeError> for WdlError {
    fn from(err: ScopeError) -> Self {
        err.at(SourcePosition::unknown())
    }
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeError::EmptyName => f.write_str("empty name"),
            ScopeError::Redefinition { name } => write!(f, "redefinition of `{}`", name),
            ScopeError::Unresolved { name } => write!(f, "unresolved `{}`", name),
        }
    }
}

/// Arena of scopes rooted at the document scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    /// Create a tree holding only the document scope, owned by `root_owner`.
    pub fn new(root_owner: NodeId) -> Self {
        Self {
            scopes: vec![Scope {
                parent: None,
                children: Vec::new(),
                symbols: IndexMap::new(),
                owner: root_owner,
            }],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0)
    }

    pub fn owner(&self, id: ScopeId) -> Option<NodeId> {
        self.get(id).map(|s| s.owner)
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id).and_then(|s| s.parent)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Allocate a detached scope.
    pub fn new_scope(&mut self, owner: NodeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: None,
            children: Vec::new(),
            symbols: IndexMap::new(),
            owner,
        });
        id
    }

    /// Append `child` to `parent`'s children and set its parent link.
    pub fn push_child(&mut self, parent: ScopeId, child: ScopeId) {
        if parent == child || parent.0 >= self.scopes.len() || child.0 >= self.scopes.len() {
            return;
        }
        self.scopes[child.0].parent = Some(parent);
        let children = &mut self.scopes[parent.0].children;
        if !children.contains(&child) {
            children.push(child);
        }
    }

    /// Bind `symbol.name` in `scope`. The first definition of a name is kept.
    pub fn define(&mut self, scope: ScopeId, symbol: Symbol) -> Result<(), ScopeError> {
        if symbol.name.is_empty() {
            return Err(ScopeError::EmptyName);
        }
        let target = self.scopes.get_mut(scope.0).ok_or_else(|| ScopeError::Unresolved {
            name: symbol.name.clone(),
        })?;
        if target.symbols.contains_key(&symbol.name) {
            return Err(ScopeError::Redefinition { name: symbol.name });
        }
        target.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Nearest binding of `name`, looking in `scope` then its ancestors.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Result<&Symbol, ScopeError> {
        self.ancestors(scope)
            .into_iter()
            .filter_map(|id| self.get(id))
            .find_map(|s| s.symbols.get(name))
            .ok_or_else(|| ScopeError::Unresolved {
                name: name.to_string(),
            })
    }

    /// Resolve `a.b.c`: the first segment through the scope chain, each later
    /// segment only among the symbols of the scope opened by the previous one.
    pub fn resolve_dotted<S: AsRef<str>>(
        &self,
        scope: ScopeId,
        segments: &[S],
    ) -> Result<&Symbol, ScopeError> {
        self.locate_dotted(scope, segments).map(|(_, symbol)| symbol)
    }

    /// Like [`resolve_dotted`](Self::resolve_dotted), also returning the scope
    /// that holds the final symbol.
    pub fn locate_dotted<S: AsRef<str>>(
        &self,
        scope: ScopeId,
        segments: &[S],
    ) -> Result<(ScopeId, &Symbol), ScopeError> {
        let unresolved = || ScopeError::Unresolved {
            name: segments
                .iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join("."),
        };
        let (first, rest) = segments.split_first().ok_or(ScopeError::EmptyName)?;
        let mut holder = self
            .defining_scope(scope, first.as_ref())
            .ok_or_else(unresolved)?;
        let mut symbol = self
            .get(holder)
            .and_then(|s| s.symbols.get(first.as_ref()))
            .ok_or_else(unresolved)?;
        for segment in rest {
            holder = symbol.scope.ok_or_else(unresolved)?;
            symbol = self
                .get(holder)
                .and_then(|inner| inner.symbols.get(segment.as_ref()))
                .ok_or_else(unresolved)?;
        }
        Ok((holder, symbol))
    }

    /// Set the scope opened by an already defined symbol.
    pub fn link_symbol(&mut self, scope: ScopeId, name: &str, opened: ScopeId) {
        if let Some(symbol) = self
            .scopes
            .get_mut(scope.0)
            .and_then(|s| s.symbols.get_mut(name))
        {
            symbol.scope = Some(opened);
        }
    }

    /// `scope` followed by each ancestor up to the document scope.
    pub fn ancestors(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut chain = Vec::new();
        let mut current = self.get(scope).map(|_| scope);
        while let Some(id) = current {
            // Parent links only ever point at earlier scopes, but stop on a repeat anyway.
            if chain.contains(&id) {
                break;
            }
            chain.push(id);
            current = self.parent(id);
        }
        chain
    }

    /// The scope in which `name` is bound, starting the search at `scope`.
    pub fn defining_scope(&self, scope: ScopeId, name: &str) -> Option<ScopeId> {
        self.ancestors(scope)
            .into_iter()
            .find(|id| self.get(*id).is_some_and(|s| s.symbols.contains_key(name)))
    }

    /// Scopes in allocation order with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes.iter().enumerate().map(|(i, s)| (ScopeId(i), s))
    }
}
