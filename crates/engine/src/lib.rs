//! Headless spreadsheet engine.
//!
//! A [`sheet::Sheet`] is a sparse two-dimensional grid of cells holding
//! literal text or formulas over other cells. Edits maintain a
//! bidirectional dependency graph, reject circular references before
//! anything is committed, and lazily memoize formula values with
//! transitive invalidation on change.

pub mod cell;
pub mod dep_graph;
pub mod error;
pub mod formula;
pub mod position;
pub mod sheet;
pub mod value;
