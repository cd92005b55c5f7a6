//! Expression evaluation logic
//!
//! The evaluator is a stack machine over an [`Expression`]'s RPN. Nested
//! expressions are pushed unevaluated and forced when an operator consumes
//! them, so the untaken branch of a conditional is never evaluated.

use super::operations::{apply_binary, apply_unary};
use super::{Expression, Operator, RpnItem};
use crate::env::{Bindings, Environment};
use crate::error::WdlError;
use crate::scope::{ScopeId, SymbolKind};
use crate::tree::{Document, NodeId};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

enum Slot<'e> {
    Ready(Value),
    Deferred(&'e Expression),
}

impl<'e> Slot<'e> {
    fn force<E: Environment + ?Sized>(self, env: &E) -> Result<Value, WdlError> {
        match self {
            Slot::Ready(value) => Ok(value),
            Slot::Deferred(expr) => evaluate(expr, env),
        }
    }
}

/// Evaluate `expr` against `env`, stopping at the first error.
pub fn evaluate<E: Environment + ?Sized>(expr: &Expression, env: &E) -> Result<Value, WdlError> {
    let mut stack: Vec<Slot<'_>> = Vec::with_capacity(expr.rpn.len());

    for item in &expr.rpn {
        match item {
            RpnItem::Value(value) => stack.push(Slot::Ready(value.clone())),
            RpnItem::Identifier { name, .. } => stack.push(Slot::Ready(env.lookup(name)?)),
            RpnItem::Expression(inner) => stack.push(Slot::Deferred(inner)),
            RpnItem::Opaque(text) => {
                return Err(WdlError::Unsupported { text: text.clone() });
            }
            RpnItem::Operator(op) => {
                if stack.len() < op.arity() {
                    return Err(WdlError::malformed(format!(
                        "{} needs {} operand(s), found {}",
                        op,
                        op.arity(),
                        stack.len()
                    )));
                }
                let mut operands = stack.split_off(stack.len() - op.arity()).into_iter();
                let result = match op {
                    Operator::Cond => {
                        let (condition, then_branch, else_branch) =
                            match (operands.next(), operands.next(), operands.next()) {
                                (Some(c), Some(t), Some(e)) => (c, t, e),
                                _ => return Err(WdlError::malformed("cond needs 3 operands")),
                            };
                        match condition.force(env)? {
                            Value::Boolean(true) => then_branch.force(env)?,
                            Value::Boolean(false) => else_branch.force(env)?,
                            other => {
                                return Err(WdlError::type_mismatch(format!(
                                    "if condition must be Boolean, found {}",
                                    other.wdl_type()
                                )))
                            }
                        }
                    }
                    _ if op.arity() == 1 => {
                        let operand = next_operand(&mut operands, *op)?.force(env)?;
                        apply_unary(*op, &operand)?
                    }
                    _ => {
                        let left = next_operand(&mut operands, *op)?.force(env)?;
                        let right = next_operand(&mut operands, *op)?.force(env)?;
                        apply_binary(*op, &left, &right)?
                    }
                };
                stack.push(Slot::Ready(result));
            }
        }
    }

    let remaining = stack.len();
    match (stack.pop(), remaining) {
        (Some(slot), 1) => slot.force(env),
        _ => Err(WdlError::malformed(format!(
            "expected one value at end of expression, found {}",
            remaining
        ))),
    }
}

fn next_operand<'e>(
    operands: &mut impl Iterator<Item = Slot<'e>>,
    op: Operator,
) -> Result<Slot<'e>, WdlError> {
    operands
        .next()
        .ok_or_else(|| WdlError::malformed(format!("missing operand for {}", op)))
}

/// Resolves identifiers through a document's scope chain.
///
/// A name bound to a declaration evaluates to the declaration's initializer,
/// itself evaluated in the scope that holds the declaration. Values supplied
/// with [`with_inputs`](Self::with_inputs) take precedence in the starting scope.
/// A declaration whose initializer refers back to itself fails as unresolved.
pub struct ScopeEnvironment<'a> {
    document: &'a Document,
    scope: ScopeId,
    inputs: Bindings<Value>,
    resolving: Rc<RefCell<HashSet<NodeId>>>,
}

impl<'a> ScopeEnvironment<'a> {
    pub fn new(document: &'a Document, scope: ScopeId) -> Self {
        Self {
            document,
            scope,
            inputs: Bindings::new(),
            resolving: Rc::new(RefCell::new(HashSet::new())),
        }
    }

    pub fn with_inputs(mut self, inputs: Bindings<Value>) -> Self {
        self.inputs = inputs;
        self
    }

    fn nested(&self, scope: ScopeId) -> ScopeEnvironment<'a> {
        ScopeEnvironment {
            document: self.document,
            scope,
            inputs: if scope == self.scope {
                self.inputs.clone()
            } else {
                Bindings::new()
            },
            resolving: Rc::clone(&self.resolving),
        }
    }
}

impl Environment for ScopeEnvironment<'_> {
    fn lookup(&self, name: &str) -> Result<Value, WdlError> {
        if let Some(value) = self.inputs.resolve(name) {
            return Ok(value.clone());
        }
        let segments: Vec<&str> = name.split('.').collect();
        let (holder, symbol) = self
            .document
            .scopes
            .locate_dotted(self.scope, &segments)
            .map_err(|_| WdlError::unresolved(name))?;
        if symbol.kind != SymbolKind::Declaration {
            return Err(WdlError::unresolved(name));
        }
        let initializer = self
            .document
            .declaration(symbol.node)
            .and_then(|decl| decl.initializer.as_ref())
            .ok_or_else(|| WdlError::unresolved(name))?;

        if !self.resolving.borrow_mut().insert(symbol.node) {
            log::debug!("circular reference through `{}`", name);
            return Err(WdlError::unresolved(name));
        }
        let result = evaluate(initializer, &self.nested(holder));
        self.resolving.borrow_mut().remove(&symbol.node);
        result
    }
}
