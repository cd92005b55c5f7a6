//! Operator tables: which operand types each operator accepts, the result
//! type, and how operands are promoted.

use super::Operator;
use crate::error::WdlError;
use crate::types::Type;
use crate::value::Value;
use std::cmp::Ordering;

/// Apply a unary operator.
pub fn apply_unary(op: Operator, operand: &Value) -> Result<Value, WdlError> {
    match (op, operand) {
        (Operator::Neg, Value::Int(i)) => Ok(Value::Int(i.wrapping_neg())),
        (Operator::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (Operator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (Operator::Str, v) => Ok(Value::String(v.render())),
        (Operator::Neg | Operator::Not, v) => Err(WdlError::type_mismatch(format!(
            "{} does not accept {}",
            op,
            v.wdl_type()
        ))),
        _ => Err(WdlError::malformed(format!("{} is not a unary operator", op))),
    }
}

/// Apply a binary operator.
pub fn apply_binary(op: Operator, left: &Value, right: &Value) -> Result<Value, WdlError> {
    let mismatch = || {
        WdlError::type_mismatch(format!(
            "{} does not accept ({}, {})",
            op,
            left.wdl_type(),
            right.wdl_type()
        ))
    };
    if op.arity() != 2 {
        return Err(WdlError::malformed(format!("{} is not a binary operator", op)));
    }

    match (left, right) {
        (Value::None, _) | (_, Value::None) => Err(mismatch()),

        (Value::Boolean(l), Value::Boolean(r)) => match op {
            Operator::And => Ok(Value::Boolean(*l && *r)),
            Operator::Or => Ok(Value::Boolean(*l || *r)),
            // false < true, the order of their textual forms
            _ => compare(op, l.cmp(r)).ok_or_else(mismatch),
        },

        (Value::Int(l), Value::Int(r)) => int_arithmetic(op, *l, *r)
            .or_else(|| compare(op, l.cmp(r)).map(Ok))
            .unwrap_or_else(|| Err(mismatch())),

        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (l, r) = match (left.as_float(), right.as_float()) {
                (Some(l), Some(r)) => (l, r),
                _ => return Err(mismatch()),
            };
            float_arithmetic(op, l, r)
                .or_else(|| l.partial_cmp(&r).and_then(|o| compare(op, o)))
                .or_else(|| float_unordered(op))
                .ok_or_else(mismatch)
        }

        (Value::String(l), Value::String(r)) => match op {
            Operator::Add => Ok(Value::String(format!("{}{}", l, r))),
            _ => compare(op, l.cmp(r)).ok_or_else(mismatch),
        },

        (Value::String(s), n @ (Value::Int(_) | Value::Float(_))) if op == Operator::Add => {
            Ok(Value::String(format!("{}{}", s, n.render())))
        }
        (n @ (Value::Int(_) | Value::Float(_)), Value::String(s)) if op == Operator::Add => {
            Ok(Value::String(format!("{}{}", n.render(), s)))
        }

        (Value::String(l) | Value::File(l), Value::String(r) | Value::File(r)) => match op {
            Operator::Add => Ok(Value::File(format!("{}{}", l, r))),
            Operator::Eq => Ok(Value::Boolean(l == r)),
            Operator::Neq => Ok(Value::Boolean(l != r)),
            _ => Err(mismatch()),
        },

        _ => Err(mismatch()),
    }
}

fn int_arithmetic(op: Operator, l: i64, r: i64) -> Option<Result<Value, WdlError>> {
    let result = match op {
        Operator::Add => l.wrapping_add(r),
        Operator::Sub => l.wrapping_sub(r),
        Operator::Mul => l.wrapping_mul(r),
        Operator::Div | Operator::Mod if r == 0 => {
            return Some(Err(WdlError::arithmetic(format!("{} by zero", op))))
        }
        Operator::Div => l.wrapping_div(r),
        Operator::Mod => l.wrapping_rem(r),
        _ => return None,
    };
    Some(Ok(Value::Int(result)))
}

fn float_arithmetic(op: Operator, l: f64, r: f64) -> Option<Value> {
    let result = match op {
        Operator::Add => l + r,
        Operator::Sub => l - r,
        Operator::Mul => l * r,
        Operator::Div => l / r,
        Operator::Mod => l % r,
        _ => return None,
    };
    Some(Value::Float(result))
}

/// Comparisons involving NaN: only `neq` holds.
fn float_unordered(op: Operator) -> Option<Value> {
    match op {
        Operator::Eq | Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
            Some(Value::Boolean(false))
        }
        Operator::Neq => Some(Value::Boolean(true)),
        _ => None,
    }
}

fn compare(op: Operator, ordering: Ordering) -> Option<Value> {
    let result = match op {
        Operator::Eq => ordering == Ordering::Equal,
        Operator::Neq => ordering != Ordering::Equal,
        Operator::Lt => ordering == Ordering::Less,
        Operator::Lte => ordering != Ordering::Greater,
        Operator::Gt => ordering == Ordering::Greater,
        Operator::Gte => ordering != Ordering::Less,
        _ => return None,
    };
    Some(Value::Boolean(result))
}

/// Result type of `op` over operands of the given types, if the pair is accepted.
pub fn result_type(op: Operator, left: Type, right: Type) -> Option<Type> {
    use Type::*;
    let comparison = matches!(
        op,
        Operator::Eq | Operator::Neq | Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte
    );
    let arithmetic = matches!(
        op,
        Operator::Add | Operator::Sub | Operator::Mul | Operator::Div | Operator::Mod
    );
    match (left, right) {
        (Any, _) | (_, Any) => None,
        (Boolean, Boolean) if comparison || matches!(op, Operator::And | Operator::Or) => {
            Some(Boolean)
        }
        (Int, Int) if arithmetic => Some(Int),
        (Int | Float, Int | Float) if arithmetic => Some(Float),
        (Int | Float, Int | Float) if comparison => Some(Boolean),
        (String, String) if op == Operator::Add => Some(String),
        (String, String) if comparison => Some(Boolean),
        (String, Int | Float) | (Int | Float, String) if op == Operator::Add => Some(String),
        (String | File, String | File) if op == Operator::Add => Some(File),
        (String | File, String | File) if matches!(op, Operator::Eq | Operator::Neq) => {
            Some(Boolean)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin(op: Operator, l: Value, r: Value) -> Value {
        apply_binary(op, &l, &r).unwrap()
    }

    #[test]
    fn test_numeric_promotion() {
        assert_eq!(bin(Operator::Add, Value::int(3), Value::float(4.0)), Value::float(7.0));
        assert_eq!(bin(Operator::Mul, Value::float(1.5), Value::int(2)), Value::float(3.0));
        assert_eq!(bin(Operator::Div, Value::int(7), Value::int(2)), Value::int(3));
        assert_eq!(bin(Operator::Mod, Value::int(-7), Value::int(3)), Value::int(-1));
        assert_eq!(bin(Operator::Mod, Value::float(7.5), Value::int(2)), Value::float(1.5));
        assert_eq!(bin(Operator::Lt, Value::int(1), Value::float(1.5)), Value::boolean(true));
    }

    #[test]
    fn test_int_wraps_on_overflow() {
        assert_eq!(bin(Operator::Add, Value::int(i64::MAX), Value::int(1)), Value::int(i64::MIN));
        assert_eq!(
            apply_unary(Operator::Neg, &Value::int(i64::MIN)).unwrap(),
            Value::int(i64::MIN)
        );
        assert_eq!(bin(Operator::Div, Value::int(i64::MIN), Value::int(-1)), Value::int(i64::MIN));
    }

    #[test]
    fn test_division_by_zero() {
        let err = apply_binary(Operator::Div, &Value::int(1), &Value::int(0)).unwrap_err();
        assert!(matches!(err, WdlError::Arithmetic { .. }));
        assert!(apply_binary(Operator::Mod, &Value::int(1), &Value::int(0)).is_err());

        let inf = bin(Operator::Div, Value::float(1.0), Value::int(0));
        assert_eq!(inf.as_float(), Some(f64::INFINITY));
        let nan = bin(Operator::Mod, Value::float(1.0), Value::float(0.0));
        assert!(nan.as_float().is_some_and(f64::is_nan));
        assert_eq!(bin(Operator::Eq, nan.clone(), nan.clone()), Value::boolean(false));
        assert_eq!(bin(Operator::Neq, nan.clone(), nan), Value::boolean(true));
    }

    #[test]
    fn test_boolean_operators() {
        assert_eq!(
            bin(Operator::And, Value::boolean(true), Value::boolean(false)),
            Value::boolean(false)
        );
        assert_eq!(
            bin(Operator::Or, Value::boolean(true), Value::boolean(false)),
            Value::boolean(true)
        );
        assert_eq!(
            bin(Operator::Lt, Value::boolean(false), Value::boolean(true)),
            Value::boolean(true)
        );
        assert!(apply_binary(Operator::Add, &Value::boolean(true), &Value::boolean(true)).is_err());
    }

    #[test]
    fn test_string_operators() {
        assert_eq!(bin(Operator::Add, Value::string("a"), Value::int(2)), Value::string("a2"));
        assert_eq!(
            bin(Operator::Add, Value::float(0.5), Value::string("x")),
            Value::string("0.5x")
        );
        assert_eq!(
            bin(Operator::Lt, Value::string("abc"), Value::string("abd")),
            Value::boolean(true)
        );
        assert!(apply_binary(Operator::Sub, &Value::string("a"), &Value::int(1)).is_err());
        assert!(apply_binary(Operator::Eq, &Value::string("1"), &Value::int(1)).is_err());
    }

    #[test]
    fn test_file_operators() {
        assert_eq!(
            bin(Operator::Add, Value::file("/data/"), Value::string("a.txt")),
            Value::file("/data/a.txt")
        );
        assert_eq!(bin(Operator::Add, Value::string("/x/"), Value::file("y")), Value::file("/x/y"));
        assert_eq!(bin(Operator::Eq, Value::file("a"), Value::string("a")), Value::boolean(true));
        assert!(apply_binary(Operator::Lt, &Value::file("a"), &Value::file("b")).is_err());
    }

    #[test]
    fn test_none_never_accepted() {
        for op in [Operator::Add, Operator::Eq, Operator::And] {
            let err = apply_binary(op, &Value::None, &Value::int(1)).unwrap_err();
            assert!(matches!(err, WdlError::TypeMismatch { .. }));
        }
        assert!(apply_unary(Operator::Neg, &Value::None).is_err());
        assert_eq!(apply_unary(Operator::Str, &Value::None).unwrap(), Value::string(""));
    }

    #[test]
    fn test_unary() {
        assert_eq!(apply_unary(Operator::Neg, &Value::float(2.5)).unwrap(), Value::float(-2.5));
        assert_eq!(
            apply_unary(Operator::Not, &Value::boolean(true)).unwrap(),
            Value::boolean(false)
        );
        assert_eq!(apply_unary(Operator::Str, &Value::int(7)).unwrap(), Value::string("7"));
        assert!(matches!(
            apply_unary(Operator::Not, &Value::int(1)),
            Err(WdlError::TypeMismatch { .. })
        ));
        assert!(matches!(
            apply_unary(Operator::Add, &Value::int(1)),
            Err(WdlError::MalformedExpression { .. })
        ));
        for value in [Value::boolean(true), Value::string("s"), Value::file("f"), Value::None] {
            assert!(apply_unary(Operator::Str, &value).is_ok());
        }
    }

    #[test]
    fn test_result_type_matches_evaluation() {
        let samples = [
            Value::boolean(true),
            Value::int(3),
            Value::float(2.0),
            Value::string("s"),
            Value::file("f"),
            Value::None,
        ];
        let ops = [
            Operator::Add,
            Operator::Sub,
            Operator::Mul,
            Operator::Eq,
            Operator::Lt,
            Operator::And,
        ];
        for op in ops {
            for l in &samples {
                for r in &samples {
                    let expected = result_type(op, l.wdl_type(), r.wdl_type());
                    let actual = apply_binary(op, l, r).ok().map(|v| v.wdl_type());
                    assert_eq!(expected, actual, "{} ({}, {})", op, l.wdl_type(), r.wdl_type());
                }
            }
        }
    }
}
