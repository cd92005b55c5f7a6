//! Compiles expression parse events into RPN.
//!
//! Binary operands are emitted straight into the current expression, and the
//! operator follows on exit of its production, so the stream order encodes the
//! grammar's precedence. Productions that wrap a sub-expression (groups, unary
//! operators, placeholders, conditional branches) arrive as a nested
//! `Expression` production; on close it is parked on the enclosing frame's
//! sub-expression stack until the wrapping production's exit pops it and emits
//! it as one nested RPN item.

use super::{Expression, Operator, RpnItem};
use crate::error::{SourcePosition, WdlError};
use crate::tree::{Ast, NodeKind, Span};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Lexical class of a primitive literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiteralClass {
    Bool,
    Int,
    Float,
    None,
}

#[derive(Debug)]
struct Frame {
    expr: Expression,
    /// Finished child expressions not yet claimed by a wrapping production
    sub_exprs: Vec<Expression>,
}

/// Per-document compiler state; the innermost open expression is the current one.
#[derive(Debug, Default)]
pub struct ExpressionCompiler {
    frames: Vec<Frame>,
    /// Operand count of each open string literal
    string_parts: Vec<usize>,
}

impl ExpressionCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an expression is open
    pub fn is_active(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Nesting depth of open expressions
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Drop all open expressions.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.string_parts.clear();
    }

    pub fn enter_expression(&mut self, ast: &mut Ast, span: Span) {
        let id = ast.new_node(NodeKind::Expression, span);
        log::trace!("enter expression {} at {}", id, span);
        self.frames.push(Frame {
            expr: Expression::new(id, span),
            sub_exprs: Vec::new(),
        });
    }

    /// Close the current expression.
    ///
    /// A nested expression is attached under its enclosing expression and parked
    /// for the wrapping production; the outermost one is returned.
    pub fn exit_expression(
        &mut self,
        ast: &mut Ast,
        span: Span,
        pos: &SourcePosition,
    ) -> Result<Option<Expression>, WdlError> {
        let Frame { mut expr, sub_exprs } = self
            .frames
            .pop()
            .ok_or_else(|| WdlError::malformed("expression exit without an open expression"))?;
        if expr.rpn.is_empty() {
            // nothing was consumed; the span points at the token that failed
            log::debug!("dropping empty expression {} at {}", expr.id, span);
            return Ok(None);
        }
        expr.span = span;
        ast.set_span(expr.id, span);
        if !sub_exprs.is_empty() {
            log::debug!("{} unclaimed sub-expression(s) in {}", sub_exprs.len(), expr.id);
        }
        log::trace!("exit expression {} = {}", expr.id, expr);

        match self.frames.last_mut() {
            Some(parent) => {
                ast.attach_child(parent.expr.id, expr.id, pos)?;
                parent.sub_exprs.push(expr);
                Ok(None)
            }
            None => Ok(Some(expr)),
        }
    }

    fn current(&mut self) -> Result<&mut Frame, WdlError> {
        self.frames
            .last_mut()
            .ok_or_else(|| WdlError::malformed("expression event outside an expression"))
    }

    fn emit(&mut self, item: RpnItem) -> Result<(), WdlError> {
        self.current()?.expr.rpn.push(item);
        Ok(())
    }

    fn pop_sub_expr(&mut self, production: &str) -> Result<Expression, WdlError> {
        self.current()?
            .sub_exprs
            .pop()
            .ok_or_else(|| WdlError::malformed(format!("{} has no operand", production)))
    }

    fn emit_nested(&mut self, production: &str) -> Result<(), WdlError> {
        let sub = self.pop_sub_expr(production)?;
        self.emit(RpnItem::Expression(Box::new(sub)))
    }

    /// A primitive literal. Text that does not parse becomes an opaque item.
    pub fn literal(&mut self, class: LiteralClass, text: &str) -> Result<(), WdlError> {
        let value = match class {
            LiteralClass::Bool => match text {
                "true" => Some(Value::Boolean(true)),
                "false" => Some(Value::Boolean(false)),
                _ => None,
            },
            LiteralClass::Int => text.parse::<i64>().ok().map(Value::Int),
            LiteralClass::Float => text.parse::<f64>().ok().map(Value::Float),
            LiteralClass::None => Some(Value::None),
        };
        match value {
            Some(value) => self.emit(RpnItem::Value(value)),
            None => {
                log::warn!("cannot read {:?} literal `{}`", class, text);
                self.emit(RpnItem::Opaque(text.to_string()))
            }
        }
    }

    pub fn identifier(&mut self, name: &str) -> Result<(), WdlError> {
        self.emit(RpnItem::identifier(name))
    }

    /// `.member` after an operand; identifier chains become one dotted name.
    pub fn member_access(&mut self, member: &str) -> Result<(), WdlError> {
        let frame = self.current()?;
        match frame.expr.rpn.pop() {
            Some(RpnItem::Identifier { name, is_reference }) => {
                frame.expr.rpn.push(RpnItem::Identifier {
                    name: format!("{}.{}", name, member),
                    is_reference,
                });
            }
            Some(other) => frame
                .expr
                .rpn
                .push(RpnItem::Opaque(format!("{}.{}", other, member))),
            None => return Err(WdlError::malformed(format!("`.{}` has no operand", member))),
        }
        Ok(())
    }

    pub fn infix(&mut self, op: Operator) -> Result<(), WdlError> {
        if op.arity() != 2 {
            return Err(WdlError::malformed(format!("{} is not an infix operator", op)));
        }
        self.emit(RpnItem::Operator(op))
    }

    /// Unary `-` or `+`; only the minus adds an operator.
    pub fn unary_sign(&mut self, negative: bool) -> Result<(), WdlError> {
        self.emit_nested("unary sign")?;
        if negative {
            self.emit(RpnItem::Operator(Operator::Neg))?;
        }
        Ok(())
    }

    pub fn logical_not(&mut self) -> Result<(), WdlError> {
        self.emit_nested("logical not")?;
        self.emit(RpnItem::Operator(Operator::Not))
    }

    pub fn group(&mut self) -> Result<(), WdlError> {
        self.emit_nested("group")
    }

    /// `if c then a else b`: three nested operands and `cond`.
    pub fn ternary(&mut self) -> Result<(), WdlError> {
        let else_branch = self.pop_sub_expr("else branch")?;
        let then_branch = self.pop_sub_expr("then branch")?;
        let condition = self.pop_sub_expr("if condition")?;
        for sub in [condition, then_branch, else_branch] {
            self.emit(RpnItem::Expression(Box::new(sub)))?;
        }
        self.emit(RpnItem::Operator(Operator::Cond))
    }

    pub fn enter_string(&mut self) {
        self.string_parts.push(0);
    }

    /// Literal text of a string, escapes already processed.
    pub fn string_part(&mut self, text: &str) -> Result<(), WdlError> {
        self.emit(RpnItem::Value(Value::String(text.to_string())))?;
        self.count_string_operand();
        Ok(())
    }

    /// `~{expr}` inside a string: the nested expression coerced with `str`.
    pub fn placeholder(&mut self) -> Result<(), WdlError> {
        self.emit_nested("placeholder")?;
        self.emit(RpnItem::Operator(Operator::Str))?;
        self.count_string_operand();
        Ok(())
    }

    /// Close a string literal, joining its operands with `add`.
    pub fn exit_string(&mut self) -> Result<(), WdlError> {
        let operands = self.string_parts.pop().unwrap_or(0);
        if operands == 0 {
            return self.emit(RpnItem::Value(Value::String(String::new())));
        }
        for _ in 1..operands {
            self.emit(RpnItem::Operator(Operator::Add))?;
        }
        Ok(())
    }

    fn count_string_operand(&mut self) {
        if let Some(count) = self.string_parts.last_mut() {
            *count += 1;
        }
    }

    /// An expression form kept as source text
    pub fn opaque(&mut self, text: &str) -> Result<(), WdlError> {
        self.emit(RpnItem::Opaque(text.to_string()))
    }
}
