//! WDL expressions compiled to Reverse Polish Notation.
//!
//! An [`Expression`] is a flat postfix sequence of [`RpnItem`]s. Grouped,
//! negated, and interpolated sub-expressions are kept as nested `Expression`
//! items instead of being spliced in, so they keep their own span and are
//! evaluated as a unit. The sequence is produced by [`compiler`] from parse
//! events and consumed by [`evaluation`]; operator semantics live in
//! [`operations`].

use crate::tree::{NodeId, Span};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod compiler;
pub mod evaluation;
pub mod operations;

pub use compiler::{ExpressionCompiler, LiteralClass};
pub use evaluation::{evaluate, ScopeEnvironment};

/// Operators that can appear in an RPN stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Neg,
    Not,
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    /// Coerce the top of the stack to `String`
    Str,
    /// `if c then a else b`; operands are the condition and both branches
    Cond,
}

impl Operator {
    /// Number of operands taken from the stack
    pub fn arity(&self) -> usize {
        match self {
            Operator::Neg | Operator::Not | Operator::Str => 1,
            Operator::Cond => 3,
            _ => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operator::Neg => "neg",
            Operator::Not => "not",
            Operator::Mul => "mul",
            Operator::Div => "div",
            Operator::Mod => "mod",
            Operator::Add => "add",
            Operator::Sub => "sub",
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Str => "str",
            Operator::Cond => "cond",
        }
    }

    /// The binary operator spelled `symbol` in WDL source.
    pub fn from_symbol(symbol: &str) -> Option<Operator> {
        let op = match symbol {
            "*" => Operator::Mul,
            "/" => Operator::Div,
            "%" => Operator::Mod,
            "+" => Operator::Add,
            "-" => Operator::Sub,
            "==" => Operator::Eq,
            "!=" => Operator::Neq,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "&&" => Operator::And,
            "||" => Operator::Or,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One element of an RPN stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RpnItem {
    Value(Value),
    Identifier { name: String, is_reference: bool },
    Operator(Operator),
    /// A sub-expression evaluated as a unit
    Expression(Box<Expression>),
    /// An expression form kept as source text only
    Opaque(String),
}

impl RpnItem {
    pub fn identifier(name: impl Into<String>) -> Self {
        RpnItem::Identifier {
            name: name.into(),
            is_reference: true,
        }
    }
}

impl fmt::Display for RpnItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpnItem::Value(v) => write!(f, "{}", v),
            RpnItem::Identifier { name, .. } => f.write_str(name),
            RpnItem::Operator(op) => write!(f, "{}", op),
            RpnItem::Expression(e) => write!(f, "Expr{}", e),
            RpnItem::Opaque(text) => write!(f, "Opaque({})", text),
        }
    }
}

/// A compiled expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub id: NodeId,
    pub span: Span,
    pub rpn: Vec<RpnItem>,
}

impl Expression {
    pub fn new(id: NodeId, span: Span) -> Self {
        Self {
            id,
            span,
            rpn: Vec::new(),
        }
    }

    /// Whether every operator finds its operands and exactly one value remains,
    /// recursively for nested expressions.
    pub fn is_well_formed(&self) -> bool {
        let mut depth = 0usize;
        for item in &self.rpn {
            match item {
                RpnItem::Operator(op) => {
                    if depth < op.arity() {
                        return false;
                    }
                    depth = depth - op.arity() + 1;
                }
                RpnItem::Expression(inner) => {
                    if !inner.is_well_formed() {
                        return false;
                    }
                    depth += 1;
                }
                _ => depth += 1,
            }
        }
        depth == 1
    }

    /// Names referenced anywhere in the expression, first occurrence first.
    pub fn referenced_identifiers(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_identifiers(&mut names);
        names
    }

    fn collect_identifiers<'a>(&'a self, names: &mut Vec<&'a str>) {
        for item in &self.rpn {
            match item {
                RpnItem::Identifier {
                    name,
                    is_reference: true,
                } if !names.contains(&name.as_str()) => names.push(name),
                RpnItem::Expression(inner) => inner.collect_identifiers(names),
                _ => {}
            }
        }
    }

    /// The single literal value, if the expression is nothing else.
    pub fn literal(&self) -> Option<&Value> {
        match self.rpn.as_slice() {
            [RpnItem::Value(v)] => Some(v),
            _ => None,
        }
    }

    /// The operator that produces the expression's result, if any.
    pub fn top_operator(&self) -> Option<Operator> {
        match self.rpn.last() {
            Some(RpnItem::Operator(op)) => Some(*op),
            Some(RpnItem::Expression(inner)) if self.rpn.len() == 1 => inner.top_operator(),
            _ => None,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, item) in self.rpn.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", item)?;
        }
        f.write_str("]")
    }
}
