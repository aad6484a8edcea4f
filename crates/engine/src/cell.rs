//! Cell contents.
//!
//! A cell holds one of three content shapes: nothing, literal text, or a
//! parsed formula. Dependency edges are *not* stored here; they live in
//! the sheet's central graph, keyed by position, so that swapping a
//! formula for text cannot orphan the reverse edges other cells hold.

use crate::formula::{Formula, ParseError, ValueLookup};
use crate::position::Position;
use crate::value::Value;

/// First character marking a formula cell.
pub const FORMULA_SIGN: char = '=';
/// Leading escape forcing literal text; kept in `text()`, dropped in `value()`.
pub const ESCAPE_SIGN: char = '\'';

#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellContent {
    #[default]
    Empty,
    Text(String),
    Formula(Formula),
}

impl CellContent {
    /// Classify raw input.
    ///
    /// The empty string is Empty; `=` followed by at least one more
    /// character is a formula over the rest; everything else, including a
    /// lone `=`, is literal text.
    pub fn classify(text: &str) -> Result<Self, ParseError> {
        if text.is_empty() {
            return Ok(CellContent::Empty);
        }
        match text.strip_prefix(FORMULA_SIGN) {
            Some(body) if !body.is_empty() => Ok(CellContent::Formula(Formula::parse(body)?)),
            _ => Ok(CellContent::Text(text.to_string())),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellContent::Empty)
    }

    pub fn formula(&self) -> Option<&Formula> {
        match self {
            CellContent::Formula(f) => Some(f),
            _ => None,
        }
    }
}

/// A cell slot on the sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    content: CellContent,
}

impl Cell {
    pub fn new(content: CellContent) -> Self {
        Self { content }
    }

    pub fn content(&self) -> &CellContent {
        &self.content
    }

    pub(crate) fn set_content(&mut self, content: CellContent) {
        self.content = content;
    }

    /// Computed value. Formula cells evaluate lazily against `lookup`
    /// (memoized inside the formula).
    pub fn value(&self, lookup: &dyn ValueLookup) -> Value {
        match &self.content {
            CellContent::Empty => Value::Number(0.0),
            CellContent::Text(s) => {
                Value::Text(s.strip_prefix(ESCAPE_SIGN).unwrap_or(s).to_string())
            }
            CellContent::Formula(f) => f.value(lookup),
        }
    }

    /// Raw text as it would be re-entered: formulas gain their `=` back,
    /// the text escape is preserved.
    pub fn text(&self) -> String {
        match &self.content {
            CellContent::Empty => String::new(),
            CellContent::Text(s) => s.clone(),
            CellContent::Formula(f) => format!("{}{}", FORMULA_SIGN, f.expression()),
        }
    }

    /// Positions this cell's formula references; empty for non-formulas.
    pub fn referenced_cells(&self) -> &[Position] {
        self.content.formula().map(|f| f.references()).unwrap_or(&[])
    }

    /// Drop the formula memo, if any. No-op for other content.
    pub(crate) fn invalidate_cache(&self) {
        if let CellContent::Formula(f) = &self.content {
            f.invalidate();
        }
    }
}
