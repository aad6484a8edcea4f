//! Edit-boundary errors.
//!
//! Everything here aborts the operation that raised it and leaves the sheet
//! untouched. Evaluation errors are not errors in this sense; they are
//! values ([`crate::value::FormulaError`]).

use thiserror::Error;

use crate::formula::ParseError;
use crate::position::Position;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Row or column outside the `MAX_ROWS x MAX_COLS` bounds.
    #[error("position out of range: row {}, col {}", .0.row, .0.col)]
    InvalidPosition(Position),

    /// The expression after `=` was rejected by the parser.
    #[error("formula parse error: {0}")]
    Formula(#[from] ParseError),

    /// Committing the edit would close a reference cycle.
    #[error("setting {0} would create a circular reference")]
    CircularDependency(Position),
}
