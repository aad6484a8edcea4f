//! Sparse sheet storage and the edit protocol.
//!
//! The sheet owns every cell and the dependency graph between them. All
//! edge maintenance happens here, inside `set_cell` / `clear_cell`; read
//! paths only ever fill formula memos (interior mutability), never edges.
//!
//! An edit is atomic: it either commits completely or leaves contents,
//! edges and caches exactly as they were. The one permitted pre-commit
//! mutation is auto-creating referenced cells as Empty, which is
//! indistinguishable from not creating them.

use std::fmt;

use log::{debug, trace};
use rustc_hash::FxHashSet;

use crate::cell::{Cell, CellContent};
use crate::dep_graph::DepGraph;
use crate::error::EngineError;
use crate::formula::ValueLookup;
use crate::position::Position;
use crate::value::Value;

#[derive(Debug, Default)]
pub struct Sheet {
    /// Row-major jagged storage. Rows and slots are allocated on demand and
    /// never shrunk; a released cell leaves a `None` slot behind.
    rows: Vec<Vec<Option<Cell>>>,
    deps: DepGraph,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cell at `pos` from raw text.
    ///
    /// The edit protocol, in order: classify the text, materialize
    /// referenced cells, check for cycles against the committed graph,
    /// commit the new content, rewire edges, invalidate dependents. The
    /// first three steps can fail; none of them changes observable state.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), EngineError> {
        self.validate(pos)?;
        let tentative = CellContent::classify(text)?;

        if let Some(formula) = tentative.formula() {
            // Referents must exist before edges can point at them. An Empty
            // cell reads exactly like an absent one, so this may precede the
            // cycle check even though the edit can still be rejected.
            for &referent in formula.references() {
                self.ensure_cell(referent);
            }
            if self.reaches(formula.references(), pos) {
                return Err(EngineError::CircularDependency(pos));
            }
        }

        let new_refs: FxHashSet<Position> = tentative
            .formula()
            .map(|f| f.references().iter().copied().collect())
            .unwrap_or_default();
        let ref_count = new_refs.len();

        self.ensure_cell(pos).set_content(tentative);
        self.deps.replace_edges(pos, new_refs);
        self.invalidate_from(pos);
        debug!("set {}: committed with {} outgoing refs", pos, ref_count);
        Ok(())
    }

    /// Empty the cell at `pos`.
    ///
    /// Outgoing edges are dropped and dependents invalidated. The slot
    /// itself is released only when no formula references it; otherwise the
    /// cell stays allocated as Empty so dependents keep a live referent.
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), EngineError> {
        self.validate(pos)?;
        let Some(slot) = self.rows.get_mut(pos.row).and_then(|r| r.get_mut(pos.col)) else {
            return Ok(());
        };
        let Some(cell) = slot.as_mut() else {
            return Ok(());
        };

        cell.set_content(CellContent::Empty);
        self.deps.clear_cell(pos);
        self.invalidate_from(pos);

        if !self.deps.is_referenced(pos) {
            self.rows[pos.row][pos.col] = None;
            debug!("clear {}: slot released", pos);
        } else {
            debug!("clear {}: kept as empty, still referenced", pos);
        }
        Ok(())
    }

    /// The cell at `pos`, or `None` if the slot was never written.
    pub fn get_cell(&self, pos: Position) -> Result<Option<&Cell>, EngineError> {
        self.validate(pos)?;
        Ok(self.cell_at(pos))
    }

    /// Computed value at `pos`. Absent cells read as `Number(0.0)`.
    pub fn value(&self, pos: Position) -> Result<Value, EngineError> {
        self.validate(pos)?;
        Ok(self.value_at(pos))
    }

    /// Raw text at `pos`. Absent cells read as the empty string.
    pub fn text(&self, pos: Position) -> Result<String, EngineError> {
        self.validate(pos)?;
        Ok(self.cell_at(pos).map(Cell::text).unwrap_or_default())
    }

    /// Cells the formula at `pos` directly references, row-major sorted.
    pub fn references(&self, pos: Position) -> Result<Vec<Position>, EngineError> {
        self.validate(pos)?;
        let mut refs: Vec<_> = self.deps.references(pos).collect();
        refs.sort_unstable();
        Ok(refs)
    }

    /// Formula cells that directly reference `pos`, row-major sorted.
    pub fn dependents(&self, pos: Position) -> Result<Vec<Position>, EngineError> {
        self.validate(pos)?;
        let mut deps: Vec<_> = self.deps.dependents(pos).collect();
        deps.sort_unstable();
        Ok(deps)
    }

    /// Smallest `(rows, cols)` bounding box covering every non-empty cell.
    ///
    /// Allocated-but-Empty cells do not count, so auto-created referents
    /// never widen the printable region.
    pub fn printable_size(&self) -> (usize, usize) {
        let mut rows = 0;
        let mut cols = 0;
        for (r, row) in self.rows.iter().enumerate() {
            for (c, slot) in row.iter().enumerate() {
                if slot.as_ref().is_some_and(|cell| !cell.content().is_empty()) {
                    rows = rows.max(r + 1);
                    cols = cols.max(c + 1);
                }
            }
        }
        (rows, cols)
    }

    /// Dump computed values over the printable region: tab-separated cells,
    /// newline-terminated rows, empty fields for absent or Empty cells.
    pub fn print_values(&self, out: &mut impl fmt::Write) -> fmt::Result {
        self.print_region(out, |cell| {
            if cell.content().is_empty() {
                String::new()
            } else {
                cell.value(self).to_string()
            }
        })
    }

    /// Like [`Sheet::print_values`], but dumping raw text (formulas appear
    /// with their `=` prefix, escaped text keeps its apostrophe).
    pub fn print_texts(&self, out: &mut impl fmt::Write) -> fmt::Result {
        self.print_region(out, Cell::text)
    }

    fn print_region(
        &self,
        out: &mut impl fmt::Write,
        mut render: impl FnMut(&Cell) -> String,
    ) -> fmt::Result {
        let (rows, cols) = self.printable_size();
        for r in 0..rows {
            for c in 0..cols {
                if c > 0 {
                    out.write_char('\t')?;
                }
                if let Some(cell) = self.cell_at(Position::new(r, c)) {
                    out.write_str(&render(cell))?;
                }
            }
            out.write_char('\n')?;
        }
        Ok(())
    }

    fn validate(&self, pos: Position) -> Result<(), EngineError> {
        if pos.is_valid() {
            Ok(())
        } else {
            Err(EngineError::InvalidPosition(pos))
        }
    }

    fn cell_at(&self, pos: Position) -> Option<&Cell> {
        self.rows
            .get(pos.row)
            .and_then(|row| row.get(pos.col))
            .and_then(|slot| slot.as_ref())
    }

    /// Allocate the slot at `pos` (growing the jagged storage as needed)
    /// and return its cell, creating an Empty one if the slot was free.
    fn ensure_cell(&mut self, pos: Position) -> &mut Cell {
        if self.rows.len() <= pos.row {
            self.rows.resize_with(pos.row + 1, Vec::new);
        }
        let row = &mut self.rows[pos.row];
        if row.len() <= pos.col {
            row.resize_with(pos.col + 1, || None);
        }
        row[pos.col].get_or_insert_with(Cell::default)
    }

    /// True if following committed formula references from `frontier` ever
    /// reaches `target`.
    ///
    /// This is the pre-commit cycle check: the walk sees only committed
    /// content, while the frontier comes from the tentative formula. The
    /// frontier and every reference list are row-major sorted, so the walk
    /// order is stable and cycle reports are deterministic.
    fn reaches(&self, frontier: &[Position], target: Position) -> bool {
        let mut visited: FxHashSet<Position> = FxHashSet::default();
        let mut stack: Vec<Position> = frontier.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            trace!("cycle check visiting {}", current);
            if let Some(formula) = self.cell_at(current).and_then(|c| c.content().formula()) {
                stack.extend(formula.references().iter().rev().copied());
            }
        }
        false
    }

    /// Drop the memoized value of `origin` and of every transitive
    /// dependent, each visited at most once.
    ///
    /// Works through shared references: memos are interior-mutable and the
    /// incoming edges are only read. The graph is acyclic (checked at every
    /// commit), so the visited set alone guarantees termination.
    fn invalidate_from(&self, origin: Position) {
        let mut visited: FxHashSet<Position> = FxHashSet::default();
        visited.insert(origin);
        let mut stack = vec![origin];
        let mut dropped = 0usize;
        while let Some(current) = stack.pop() {
            if let Some(cell) = self.cell_at(current) {
                cell.invalidate_cache();
                dropped += 1;
            }
            for dependent in self.deps.dependents(current) {
                if visited.insert(dependent) {
                    stack.push(dependent);
                }
            }
        }
        debug!("invalidated {} cells from {}", dropped, origin);
    }
}

impl ValueLookup for Sheet {
    fn value_at(&self, pos: Position) -> Value {
        match self.cell_at(pos) {
            Some(cell) => cell.value(self),
            None => Value::Number(0.0),
        }
    }
}
