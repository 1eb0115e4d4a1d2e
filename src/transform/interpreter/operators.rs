//! Operator semantics.
//!
//! Operands never coerce between kinds: `1 + 1.0` is a type mismatch and
//! `1 == 1.0` is false.

use crate::diagnostic::Span;
use crate::error::RuntimeFault;
use crate::transform::ast::{BinaryOperator, UnaryOperator};
use crate::value::Value;
use std::cmp::Ordering;

/// Applies a non-logical binary operator to evaluated operands.
pub fn apply_binary(
    operator: BinaryOperator,
    left: Value,
    right: Value,
    span: Span,
) -> Result<Value, RuntimeFault> {
    match operator {
        BinaryOperator::Add => add(left, right, span),
        BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Remainder => arithmetic(operator, left, right, span),
        BinaryOperator::Equal => Ok(Value::Boolean(left == right)),
        BinaryOperator::NotEqual => Ok(Value::Boolean(left != right)),
        BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => compare(operator, &left, &right, span),
        BinaryOperator::And | BinaryOperator::Or => Err(RuntimeFault::invalid_argument(
            format!("`{}` must be evaluated lazily", operator),
            Some(span),
        )),
    }
}

pub fn apply_unary(
    operator: UnaryOperator,
    value: Value,
    span: Span,
) -> Result<Value, RuntimeFault> {
    match (operator, value) {
        (UnaryOperator::Negate, Value::Integer(i)) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| overflow(&format!("-({})", i), span)),
        (UnaryOperator::Negate, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOperator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (UnaryOperator::Negate, other) => Err(RuntimeFault::type_mismatch(
            format!("cannot negate {}", other.kind()),
            span,
        )),
        (UnaryOperator::Not, other) => Err(RuntimeFault::type_mismatch(
            format!("operand of `!` must be a boolean, got {}", other.kind()),
            span,
        )),
    }
}

fn add(left: Value, right: Value, span: Span) -> Result<Value, RuntimeFault> {
    match (left, right) {
        (Value::String(mut l), Value::String(r)) => {
            l.push_str(&r);
            Ok(Value::String(l))
        }
        (left, right) => arithmetic(BinaryOperator::Add, left, right, span),
    }
}

fn arithmetic(
    operator: BinaryOperator,
    left: Value,
    right: Value,
    span: Span,
) -> Result<Value, RuntimeFault> {
    match (&left, &right) {
        (Value::Integer(l), Value::Integer(r)) => integer_arithmetic(operator, *l, *r, span),
        (Value::Float(l), Value::Float(r)) => float_arithmetic(operator, *l, *r, span),
        _ => Err(mismatch(operator, &left, &right, span)),
    }
}

fn integer_arithmetic(
    operator: BinaryOperator,
    l: i64,
    r: i64,
    span: Span,
) -> Result<Value, RuntimeFault> {
    if r == 0 && matches!(operator, BinaryOperator::Divide | BinaryOperator::Remainder) {
        return Err(RuntimeFault::DivisionByZero { span: Some(span) });
    }
    let result = match operator {
        BinaryOperator::Add => l.checked_add(r),
        BinaryOperator::Subtract => l.checked_sub(r),
        BinaryOperator::Multiply => l.checked_mul(r),
        BinaryOperator::Divide => l.checked_div(r),
        BinaryOperator::Remainder => l.checked_rem(r),
        _ => None,
    };
    result
        .map(Value::Integer)
        .ok_or_else(|| overflow(&format!("{} {} {}", l, operator, r), span))
}

fn float_arithmetic(
    operator: BinaryOperator,
    l: f64,
    r: f64,
    span: Span,
) -> Result<Value, RuntimeFault> {
    let result = match operator {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide | BinaryOperator::Remainder if r == 0.0 => {
            return Err(RuntimeFault::DivisionByZero { span: Some(span) })
        }
        BinaryOperator::Divide => l / r,
        BinaryOperator::Remainder => l % r,
        _ => {
            return Err(RuntimeFault::invalid_argument(
                format!("`{}` is not an arithmetic operator", operator),
                Some(span),
            ))
        }
    };
    Ok(Value::Float(result))
}

fn compare(
    operator: BinaryOperator,
    left: &Value,
    right: &Value,
    span: Span,
) -> Result<Value, RuntimeFault> {
    let ordering = match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => Some(l.cmp(r)),
        (Value::Float(l), Value::Float(r)) => l.partial_cmp(r),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Timestamp(l), Value::Timestamp(r)) => Some(l.cmp(r)),
        _ => return Err(mismatch(operator, left, right, span)),
    };
    // NaN compares false against everything.
    let Some(ordering) = ordering else {
        return Ok(Value::Boolean(false));
    };
    let result = match operator {
        BinaryOperator::LessThan => ordering == Ordering::Less,
        BinaryOperator::LessThanOrEqual => ordering != Ordering::Greater,
        BinaryOperator::GreaterThan => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    };
    Ok(Value::Boolean(result))
}

fn mismatch(operator: BinaryOperator, left: &Value, right: &Value, span: Span) -> RuntimeFault {
    RuntimeFault::type_mismatch(
        format!(
            "cannot apply `{}` to {} and {}",
            operator,
            left.kind(),
            right.kind()
        ),
        span,
    )
}

fn overflow(expression: &str, span: Span) -> RuntimeFault {
    RuntimeFault::invalid_argument(format!("integer overflow in {}", expression), Some(span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;

    fn span() -> Span {
        Span::new(0, 1, 1, 1)
    }

    fn binary(operator: BinaryOperator, left: Value, right: Value) -> Result<Value, RuntimeFault> {
        apply_binary(operator, left, right, span())
    }

    #[test]
    fn test_same_kind_arithmetic() {
        assert_eq!(
            binary(BinaryOperator::Add, Value::Integer(2), Value::Integer(3)),
            Ok(Value::Integer(5))
        );
        assert_eq!(
            binary(BinaryOperator::Multiply, Value::Float(1.5), Value::Float(2.0)),
            Ok(Value::Float(3.0))
        );
        assert_eq!(
            binary(BinaryOperator::Remainder, Value::Integer(7), Value::Integer(3)),
            Ok(Value::Integer(1))
        );
        assert_eq!(
            binary(BinaryOperator::Add, Value::from("ab"), Value::from("cd")),
            Ok(Value::from("abcd"))
        );
    }

    #[test]
    fn test_no_implicit_coercion() {
        let err = binary(BinaryOperator::Add, Value::Integer(1), Value::Float(1.0)).unwrap_err();
        assert_eq!(err.kind(), FaultKind::TypeMismatch);
        assert_eq!(
            err.to_string(),
            "type mismatch: cannot apply `+` to integer and float"
        );
        assert_eq!(
            binary(BinaryOperator::Equal, Value::Integer(1), Value::Float(1.0)),
            Ok(Value::Boolean(false))
        );
    }

    #[test]
    fn test_division_by_zero() {
        for (l, r) in [
            (Value::Integer(1), Value::Integer(0)),
            (Value::Float(1.0), Value::Float(0.0)),
        ] {
            let err = binary(BinaryOperator::Divide, l, r).unwrap_err();
            assert_eq!(err.kind(), FaultKind::DivisionByZero);
        }
        let err = binary(BinaryOperator::Remainder, Value::Integer(1), Value::Integer(0))
            .unwrap_err();
        assert_eq!(err.kind(), FaultKind::DivisionByZero);
    }

    #[test]
    fn test_integer_overflow() {
        let err = binary(BinaryOperator::Add, Value::Integer(i64::MAX), Value::Integer(1))
            .unwrap_err();
        assert_eq!(err.kind(), FaultKind::InvalidArgument);
        let err = apply_unary(UnaryOperator::Negate, Value::Integer(i64::MIN), span()).unwrap_err();
        assert_eq!(err.kind(), FaultKind::InvalidArgument);
    }

    #[test]
    fn test_ordering() {
        assert_eq!(
            binary(BinaryOperator::LessThan, Value::from("a"), Value::from("b")),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            binary(BinaryOperator::GreaterThanOrEqual, Value::Integer(2), Value::Integer(2)),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            binary(BinaryOperator::LessThan, Value::Float(f64::NAN), Value::Float(1.0)),
            Ok(Value::Boolean(false))
        );
        assert!(binary(BinaryOperator::LessThan, Value::Integer(1), Value::from("2")).is_err());
    }
}
