//! Dependency graph between cells.
//!
//! Tracks, for every formula cell, the cells its formula reads (`outgoing`),
//! and for every referenced cell, the formula cells reading it (`incoming`).
//!
//! # Edge Direction
//!
//! ```text
//! A -> B  means  "A's formula references B"
//! ```
//!
//! `outgoing` answers "what does this formula read?"; `incoming` answers
//! "whose caches break if this cell changes?".
//!
//! # Invariants
//!
//! 1. **Symmetry:** `B ∈ outgoing[A]` iff `A ∈ incoming[B]`.
//! 2. **No dangling entries:** empty sets are removed, not stored.
//! 3. **Atomic updates:** `replace_edges` is the only mutator touching both
//!    maps.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::position::Position;

#[derive(Default, Debug, Clone)]
pub struct DepGraph {
    /// For each formula cell A, the cells its formula references.
    outgoing: FxHashMap<Position, FxHashSet<Position>>,
    /// For each referenced cell B, the formula cells referencing it.
    incoming: FxHashMap<Position, FxHashSet<Position>>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cells the formula at `cell` directly references.
    pub fn references(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.outgoing
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// Formula cells that directly reference `cell`.
    pub fn dependents(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.incoming
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// True if at least one formula references `cell`.
    pub fn is_referenced(&self, cell: Position) -> bool {
        self.incoming.contains_key(&cell)
    }

    /// Replace all outgoing edges of `cell` atomically.
    ///
    /// Removes `cell` from every old referent's incoming set, then inserts
    /// it into every new referent's. Pass an empty set for non-formula
    /// content.
    pub fn replace_edges(&mut self, cell: Position, new_refs: FxHashSet<Position>) {
        if let Some(old_refs) = self.outgoing.remove(&cell) {
            for referent in old_refs {
                if let Some(deps) = self.incoming.get_mut(&referent) {
                    deps.remove(&cell);
                    if deps.is_empty() {
                        self.incoming.remove(&referent);
                    }
                }
            }
        }

        if new_refs.is_empty() {
            return;
        }

        for referent in &new_refs {
            self.incoming.entry(*referent).or_default().insert(cell);
        }
        self.outgoing.insert(cell, new_refs);
    }

    /// Drop all outgoing edges of `cell`. Its incoming edges are untouched:
    /// other formulas may still legitimately reference it.
    pub fn clear_cell(&mut self, cell: Position) {
        self.replace_edges(cell, FxHashSet::default());
    }

    /// Check all invariants. Panics if any are violated.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        for (cell, refs) in &self.outgoing {
            for referent in refs {
                assert!(
                    self.incoming
                        .get(referent)
                        .map_or(false, |s| s.contains(cell)),
                    "missing incoming edge: {} should list {}",
                    referent,
                    cell
                );
            }
        }
        for (cell, deps) in &self.incoming {
            for dep in deps {
                assert!(
                    self.outgoing.get(dep).map_or(false, |s| s.contains(cell)),
                    "missing outgoing edge: {} should list {}",
                    dep,
                    cell
                );
            }
        }
        for (cell, refs) in &self.outgoing {
            assert!(!refs.is_empty(), "empty outgoing set stored for {}", cell);
        }
        for (cell, deps) in &self.incoming {
            assert!(!deps.is_empty(), "empty incoming set stored for {}", cell);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(row: usize, col: usize) -> Position {
        Position::new(row, col)
    }

    fn set(cells: &[Position]) -> FxHashSet<Position> {
        cells.iter().copied().collect()
    }

    #[test]
    fn test_empty_graph() {
        let graph = DepGraph::new();
        assert_eq!(graph.references(pos(0, 0)).count(), 0);
        assert_eq!(graph.dependents(pos(0, 0)).count(), 0);
        assert!(!graph.is_referenced(pos(0, 0)));
        graph.assert_consistent();
    }

    #[test]
    fn test_single_edge() {
        // B1 = A1
        let mut graph = DepGraph::new();
        let a1 = pos(0, 0);
        let b1 = pos(0, 1);

        graph.replace_edges(b1, set(&[a1]));
        graph.assert_consistent();

        assert_eq!(graph.references(b1).collect::<Vec<_>>(), vec![a1]);
        assert_eq!(graph.dependents(a1).collect::<Vec<_>>(), vec![b1]);
        assert!(graph.is_referenced(a1));
        assert!(!graph.is_referenced(b1));
    }

    #[test]
    fn test_multiple_references() {
        // C1 = A1 + B1
        let mut graph = DepGraph::new();
        let a1 = pos(0, 0);
        let b1 = pos(0, 1);
        let c1 = pos(0, 2);

        graph.replace_edges(c1, set(&[a1, b1]));
        graph.assert_consistent();

        let mut refs: Vec<_> = graph.references(c1).collect();
        refs.sort_unstable();
        assert_eq!(refs, vec![a1, b1]);
        assert_eq!(graph.dependents(a1).collect::<Vec<_>>(), vec![c1]);
        assert_eq!(graph.dependents(b1).collect::<Vec<_>>(), vec![c1]);
    }

    #[test]
    fn test_multiple_dependents() {
        // B1 = A1, C1 = A1
        let mut graph = DepGraph::new();
        let a1 = pos(0, 0);
        let b1 = pos(0, 1);
        let c1 = pos(0, 2);

        graph.replace_edges(b1, set(&[a1]));
        graph.replace_edges(c1, set(&[a1]));
        graph.assert_consistent();

        let mut deps: Vec<_> = graph.dependents(a1).collect();
        deps.sort_unstable();
        assert_eq!(deps, vec![b1, c1]);
    }

    #[test]
    fn test_rewiring() {
        // B1 = A1, then B1 = A2
        let mut graph = DepGraph::new();
        let a1 = pos(0, 0);
        let a2 = pos(1, 0);
        let b1 = pos(0, 1);

        graph.replace_edges(b1, set(&[a1]));
        graph.replace_edges(b1, set(&[a2]));
        graph.assert_consistent();

        assert_eq!(graph.references(b1).collect::<Vec<_>>(), vec![a2]);
        assert_eq!(graph.dependents(a2).collect::<Vec<_>>(), vec![b1]);
        assert_eq!(graph.dependents(a1).count(), 0);
        assert!(!graph.is_referenced(a1));
    }

    #[test]
    fn test_unwiring() {
        let mut graph = DepGraph::new();
        let a1 = pos(0, 0);
        let b1 = pos(0, 1);

        graph.replace_edges(b1, set(&[a1]));
        graph.clear_cell(b1);
        graph.assert_consistent();

        assert_eq!(graph.references(b1).count(), 0);
        assert_eq!(graph.dependents(a1).count(), 0);
        assert!(!graph.is_referenced(a1));
    }

    #[test]
    fn test_clear_keeps_incoming() {
        // B1 = A1; clearing A1's own edges must not detach B1's edge to it.
        let mut graph = DepGraph::new();
        let a1 = pos(0, 0);
        let b1 = pos(0, 1);

        graph.replace_edges(b1, set(&[a1]));
        graph.clear_cell(a1);
        graph.assert_consistent();

        assert!(graph.is_referenced(a1));
        assert_eq!(graph.dependents(a1).collect::<Vec<_>>(), vec![b1]);
    }

    #[test]
    fn test_diamond() {
        //     A1
        //    /  \
        //   B1   C1
        //    \  /
        //     D1
        let mut graph = DepGraph::new();
        let a1 = pos(0, 0);
        let b1 = pos(0, 1);
        let c1 = pos(0, 2);
        let d1 = pos(0, 3);

        graph.replace_edges(b1, set(&[a1]));
        graph.replace_edges(c1, set(&[a1]));
        graph.replace_edges(d1, set(&[b1, c1]));
        graph.assert_consistent();

        let mut d1_refs: Vec<_> = graph.references(d1).collect();
        d1_refs.sort_unstable();
        assert_eq!(d1_refs, vec![b1, c1]);

        let mut a1_deps: Vec<_> = graph.dependents(a1).collect();
        a1_deps.sort_unstable();
        assert_eq!(a1_deps, vec![b1, c1]);
    }
}
