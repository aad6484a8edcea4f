//! Formula evaluation.
//!
//! Evaluation reduces an expression tree to a single `f64` against a
//! [`ValueLookup`], or short-circuits with the first [`FormulaError`].

use once_cell::sync::Lazy;
use regex::Regex;

use super::parser::{BinaryOp, Expr, UnaryOp};
use crate::position::Position;
use crate::value::{FormulaError, Value};

/// The texts accepted as numbers when a formula reads a text cell.
/// Deliberately stricter than `f64::from_str`: no leading `+`, no exponent,
/// no whitespace, no bare `.5`.
static NUMERIC_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?$").expect("numeric text pattern"));

/// Seam between the evaluator and cell storage.
pub trait ValueLookup {
    /// Current value of the cell at `pos`. Implementations report absent
    /// cells as `Number(0.0)`.
    fn value_at(&self, pos: Position) -> Value;
}

/// Evaluate `expr` against `lookup`.
pub fn evaluate(expr: &Expr, lookup: &dyn ValueLookup) -> Result<f64, FormulaError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Ref(pos) => coerce(lookup.value_at(*pos)),
        Expr::RefError(_) => Err(FormulaError::Ref),
        Expr::Unary { op, operand } => {
            let operand = evaluate(operand, lookup)?;
            Ok(match op {
                UnaryOp::Plus => operand,
                UnaryOp::Minus => -operand,
            })
        }
        Expr::Binary { op, left, right } => {
            let lhs = evaluate(left, lookup)?;
            let rhs = evaluate(right, lookup)?;
            let result = match op {
                BinaryOp::Add => lhs + rhs,
                BinaryOp::Sub => lhs - rhs,
                BinaryOp::Mul => lhs * rhs,
                BinaryOp::Div => {
                    if rhs == 0.0 {
                        return Err(FormulaError::Arithmetic);
                    }
                    lhs / rhs
                }
            };
            if result.is_finite() {
                Ok(result)
            } else {
                Err(FormulaError::Arithmetic)
            }
        }
    }
}

/// Numeric reading of a referenced cell's value.
fn coerce(value: Value) -> Result<f64, FormulaError> {
    match value {
        Value::Number(n) => Ok(n),
        Value::Text(s) => {
            if NUMERIC_TEXT.is_match(&s) {
                s.parse().map_err(|_| FormulaError::Value)
            } else {
                Err(FormulaError::Value)
            }
        }
        Value::Error(e) => Err(e),
    }
}
