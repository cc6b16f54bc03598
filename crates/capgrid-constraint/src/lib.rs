//! Constraint expressions over pool and device attributes.
//!
//! Device claims may carry a boolean expression that filters which
//! devices are considered, evaluated against the union of pool and
//! device attributes (device wins on name collisions):
//!
//! ```text
//! device.model == "foozer-1000" && device.net-speed >= "10G"
//! device.firmware-version >= "1.3.8" || device.vf-count > 8
//! ```
//!
//! The grammar is a small boolean algebra: attribute references
//! (`device.<name>`), string / integer / boolean literals, `==` and `!=`
//! on every attribute kind, ordered comparison on integer, quantity, and
//! semver kinds, `&&`, `||`, `!`, and parentheses. String literals are
//! coerced when compared against a quantity or semver attribute.
//!
//! An absent or empty expression evaluates to true. Failures (unknown
//! attribute, type mismatch, malformed expression) are errors, not
//! `false`: the caller reports the device as failing with the error text
//! rather than silently skipping it.

mod eval;
mod parse;

use std::collections::HashMap;

use capgrid_core::attribute::AttributeValue;
use capgrid_core::quantity::QuantityError;
use thiserror::Error;

/// Merged attribute lookup, keyed by bare attribute name.
pub type AttributeMap<'a> = HashMap<&'a str, &'a AttributeValue>;

#[derive(Debug, Error, PartialEq)]
pub enum ConstraintError {
    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("unknown attribute {0:?}")]
    UnknownAttribute(String),

    #[error("cannot compare {left} with {right}")]
    Incomparable {
        left: &'static str,
        right: &'static str,
    },

    #[error("ordering is not defined for {0} values")]
    Unordered(&'static str),

    #[error("expected a boolean, got a {0} value")]
    NotBoolean(&'static str),

    #[error("invalid {kind} literal {value:?}")]
    BadLiteral { kind: &'static str, value: String },

    #[error(transparent)]
    Quantity(#[from] QuantityError),
}

/// Evaluate an optional constraint expression against merged attributes.
///
/// `None` and blank expressions are vacuously true.
pub fn evaluate(
    constraints: Option<&str>,
    attributes: &AttributeMap<'_>,
) -> Result<bool, ConstraintError> {
    let Some(expr) = constraints else {
        return Ok(true);
    };
    if expr.trim().is_empty() {
        return Ok(true);
    }
    let ast = parse::parse(expr)?;
    eval::evaluate(&ast, attributes)
}
