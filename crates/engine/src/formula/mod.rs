//! Parsed formulas.
//!
//! [`Formula`] wraps the expression AST together with the two things the
//! rest of the engine needs from it: the ordered list of referenced
//! positions and a memoized numeric result.

pub mod eval;
pub mod parser;

pub use eval::ValueLookup;
pub use parser::ParseError;

use rustc_hash::FxHashSet;

use crate::position::Position;
use crate::value::Value;
use parser::Expr;

/// A parsed formula expression.
#[derive(Debug, Clone)]
pub struct Formula {
    expr: Expr,
    /// Referenced positions, deduplicated and row-major sorted at parse time.
    references: Vec<Position>,
    /// Single-slot memo for the last numeric result. Errors never land here.
    cache: std::cell::Cell<Option<f64>>,
}

impl Formula {
    /// Parse the expression after the `=` sign.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let expr = parser::parse(source)?;
        let mut seen = FxHashSet::default();
        let mut references = Vec::new();
        collect_references(&expr, &mut seen, &mut references);
        references.sort_unstable();
        Ok(Self {
            expr,
            references,
            cache: std::cell::Cell::new(None),
        })
    }

    /// Positions this formula reads, in row-major order without duplicates.
    /// Out-of-range references are not included; they cannot exist on a
    /// sheet and surface as a reference error at evaluation instead.
    pub fn references(&self) -> &[Position] {
        &self.references
    }

    /// Canonical rendition of the expression, without the `=` prefix.
    /// May differ from the input text in whitespace and parenthesization.
    pub fn expression(&self) -> String {
        self.expr.to_string()
    }

    /// Evaluate against `lookup`, memoizing a numeric result.
    ///
    /// An error result is returned but not stored, so the next read
    /// re-evaluates and recovers as soon as the inputs are fixed.
    pub fn value(&self, lookup: &dyn ValueLookup) -> Value {
        if let Some(cached) = self.cache.get() {
            return Value::Number(cached);
        }
        match eval::evaluate(&self.expr, lookup) {
            Ok(number) => {
                self.cache.set(Some(number));
                Value::Number(number)
            }
            Err(error) => Value::Error(error),
        }
    }

    /// Drop the memoized result.
    pub fn invalidate(&self) {
        self.cache.set(None);
    }

    /// Current memo contents, for cache-behavior assertions.
    #[cfg(test)]
    pub(crate) fn cached(&self) -> Option<f64> {
        self.cache.get()
    }
}

/// Formulas compare by expression; the memo slot is transient state and
/// carries no meaning of its own.
impl PartialEq for Formula {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

fn collect_references(expr: &Expr, seen: &mut FxHashSet<Position>, out: &mut Vec<Position>) {
    match expr {
        Expr::Number(_) | Expr::RefError(_) => {}
        Expr::Ref(pos) => {
            if seen.insert(*pos) {
                out.push(*pos);
            }
        }
        Expr::Unary { operand, .. } => collect_references(operand, seen, out),
        Expr::Binary { left, right, .. } => {
            collect_references(left, seen, out);
            collect_references(right, seen, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FormulaError;

    struct Constant(f64);

    impl ValueLookup for Constant {
        fn value_at(&self, _pos: Position) -> Value {
            Value::Number(self.0)
        }
    }

    struct Failing;

    impl ValueLookup for Failing {
        fn value_at(&self, _pos: Position) -> Value {
            Value::Error(FormulaError::Value)
        }
    }

    #[test]
    fn test_references_are_sorted_and_unique() {
        let formula = Formula::parse("B2+A1+B2+A3*A1").unwrap();
        assert_eq!(
            formula.references(),
            &[
                Position::new(0, 0), // A1
                Position::new(1, 1), // B2
                Position::new(2, 0), // A3
            ]
        );
    }

    #[test]
    fn test_references_skip_out_of_range() {
        let formula = Formula::parse("A1+A99999").unwrap();
        assert_eq!(formula.references(), &[Position::new(0, 0)]);
    }

    #[test]
    fn test_expression_is_canonical() {
        let formula = Formula::parse(" (1 + 2) *  a1 ").unwrap();
        assert_eq!(formula.expression(), "(1+2)*A1");
    }

    #[test]
    fn test_numeric_result_is_cached() {
        let formula = Formula::parse("A1+1").unwrap();
        assert_eq!(formula.cached(), None);
        assert_eq!(formula.value(&Constant(2.0)), Value::Number(3.0));
        assert_eq!(formula.cached(), Some(3.0));
        // A cache hit ignores the lookup entirely.
        assert_eq!(formula.value(&Constant(100.0)), Value::Number(3.0));
    }

    #[test]
    fn test_errors_are_never_cached() {
        let formula = Formula::parse("A1").unwrap();
        assert_eq!(
            formula.value(&Failing),
            Value::Error(FormulaError::Value)
        );
        assert_eq!(formula.cached(), None);
        // A later read against a healthy lookup recovers.
        assert_eq!(formula.value(&Constant(4.0)), Value::Number(4.0));
    }

    #[test]
    fn test_invalidate_forces_reevaluation() {
        let formula = Formula::parse("A1").unwrap();
        assert_eq!(formula.value(&Constant(1.0)), Value::Number(1.0));
        formula.invalidate();
        assert_eq!(formula.value(&Constant(2.0)), Value::Number(2.0));
    }
}
