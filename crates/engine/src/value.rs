//! Computed cell values.

use serde::{Deserialize, Serialize};

/// Evaluation-level error. Unlike [`crate::error::EngineError`], these are
/// ordinary cell values: a formula over a bad input *evaluates to* an error
/// and the sheet stays editable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaError {
    /// Reference to a position outside the sheet bounds.
    Ref,
    /// A referenced text cell could not be coerced to a number.
    Value,
    /// Division by zero or a non-finite intermediate result.
    Arithmetic,
}

impl FormulaError {
    /// Short display name, used wherever the error is rendered.
    pub fn as_str(self) -> &'static str {
        match self {
            FormulaError::Ref => "#REF!",
            FormulaError::Value => "#VALUE!",
            FormulaError::Arithmetic => "#DIV/0!",
        }
    }
}

impl std::fmt::Display for FormulaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The computed output of a cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
    Error(FormulaError),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Error(e) => f.write_str(e.as_str()),
        }
    }
}
