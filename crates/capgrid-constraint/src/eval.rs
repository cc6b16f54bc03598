//! Evaluation of parsed constraint expressions against attribute maps.

use std::cmp::Ordering;

use capgrid_core::attribute::AttributeValue;
use capgrid_core::quantity::Quantity;

use crate::parse::{CmpOp, Expr};
use crate::{AttributeMap, ConstraintError};

/// An evaluated operand. Attribute references resolve to the kind the
/// attribute was published with; literals start as string/int/bool and
/// may be coerced by comparison.
#[derive(Debug, Clone)]
enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    Quantity(Quantity),
    Version(semver::Version),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
            Value::Quantity(_) => "quantity",
            Value::Version(_) => "semver",
        }
    }
}

pub(crate) fn evaluate(expr: &Expr, attributes: &AttributeMap<'_>) -> Result<bool, ConstraintError> {
    match eval_expr(expr, attributes)? {
        Value::Bool(b) => Ok(b),
        other => Err(ConstraintError::NotBoolean(other.kind())),
    }
}

fn eval_expr(expr: &Expr, attributes: &AttributeMap<'_>) -> Result<Value, ConstraintError> {
    match expr {
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Int(v) => Ok(Value::Int(*v)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Attr(name) => {
            let value = attributes
                .get(name.as_str())
                .ok_or_else(|| ConstraintError::UnknownAttribute(format!("device.{name}")))?;
            Ok(match value {
                AttributeValue::StringValue(s) => Value::Str(s.clone()),
                AttributeValue::IntValue(i) => Value::Int(*i),
                AttributeValue::QuantityValue(q) => Value::Quantity(*q),
                AttributeValue::SemVerValue(v) => Value::Version(v.clone()),
            })
        }
        Expr::Not(inner) => {
            let value = evaluate(inner, attributes)?;
            Ok(Value::Bool(!value))
        }
        Expr::And(lhs, rhs) => {
            if !evaluate(lhs, attributes)? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(evaluate(rhs, attributes)?))
        }
        Expr::Or(lhs, rhs) => {
            if evaluate(lhs, attributes)? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(evaluate(rhs, attributes)?))
        }
        Expr::Cmp(lhs, op, rhs) => {
            let left = eval_expr(lhs, attributes)?;
            let right = eval_expr(rhs, attributes)?;
            compare(&left, *op, &right).map(Value::Bool)
        }
    }
}

fn compare(left: &Value, op: CmpOp, right: &Value) -> Result<bool, ConstraintError> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Quantity(a), Value::Quantity(b)) => a.cmp(b),
        (Value::Quantity(a), Value::Int(b)) => a.cmp(&Quantity::from_int(*b)),
        (Value::Int(a), Value::Quantity(b)) => Quantity::from_int(*a).cmp(b),
        (Value::Quantity(a), Value::Str(s)) => a.cmp(&parse_quantity(s)?),
        (Value::Str(s), Value::Quantity(b)) => parse_quantity(s)?.cmp(b),
        (Value::Version(a), Value::Version(b)) => a.cmp(b),
        (Value::Version(a), Value::Str(s)) => a.cmp(&parse_version(s)?),
        (Value::Str(s), Value::Version(b)) => parse_version(s)?.cmp(b),
        (Value::Str(a), Value::Str(b)) => {
            return equality_only(op, a == b, "string");
        }
        (Value::Bool(a), Value::Bool(b)) => {
            return equality_only(op, a == b, "boolean");
        }
        (l, r) => {
            return Err(ConstraintError::Incomparable {
                left: l.kind(),
                right: r.kind(),
            });
        }
    };

    Ok(match op {
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::Ne => ordering != Ordering::Equal,
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Ge => ordering != Ordering::Less,
    })
}

fn equality_only(op: CmpOp, equal: bool, kind: &'static str) -> Result<bool, ConstraintError> {
    match op {
        CmpOp::Eq => Ok(equal),
        CmpOp::Ne => Ok(!equal),
        _ => Err(ConstraintError::Unordered(kind)),
    }
}

fn parse_quantity(s: &str) -> Result<Quantity, ConstraintError> {
    s.parse().map_err(ConstraintError::Quantity)
}

fn parse_version(s: &str) -> Result<semver::Version, ConstraintError> {
    s.parse().map_err(|_| ConstraintError::BadLiteral {
        kind: "semver",
        value: s.to_string(),
    })
}
