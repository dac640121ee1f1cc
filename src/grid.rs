//! Sparse grid of cells with dependency tracking and lazy evaluation.
//!
//! The grid owns every cell and the dependency graph between them. Edits
//! run a fixed pipeline: classify, parse, cycle-check, invalidate caches,
//! rewire edges, install the new form. Reads are pure and memoized.

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::cell::Cell;
use crate::dep_graph::DepGraph;
use crate::error::GridError;
use crate::formula::eval::CellLookup;
use crate::formula::parser;
use crate::position::{Position, Size};
use crate::value::Value;

#[derive(Debug, Default)]
pub struct Grid {
    cells: FxHashMap<Position, Cell>,
    deps: DepGraph,
    /// Per-row count of externally visible cells. Ordered so the printable
    /// rectangle is the largest key; zero entries are removed.
    row_counts: BTreeMap<u32, usize>,
    /// Per-column count, symmetric with `row_counts`.
    col_counts: BTreeMap<u32, usize>,
}

/// Read-only view of an externally visible cell.
#[derive(Clone, Copy)]
pub struct CellRef<'a> {
    grid: &'a Grid,
    cell: &'a Cell,
}

impl<'a> CellRef<'a> {
    /// The cell's computed value (memoized).
    pub fn value(&self) -> Value {
        self.cell.value(self.grid)
    }

    /// The cell's text: verbatim for plain text, canonical for formulas.
    pub fn text(&self) -> String {
        self.cell.text()
    }

    /// The positions the cell's formula references; empty for plain text.
    pub fn referenced_cells(&self) -> &'a [Position] {
        self.cell.referenced_cells()
    }
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `text` at `pos`.
    ///
    /// Text starting with `=` (and at least two characters long) is a
    /// formula; everything else is stored verbatim. Setting the same raw
    /// text twice is a no-op. On any error the grid is left unchanged,
    /// except that the entry at `pos` may now exist in Empty form
    /// (invisible to `cell()` and the printable area).
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), GridError> {
        if !pos.is_valid() {
            return Err(GridError::InvalidPosition(pos));
        }

        let entry = self.cells.entry(pos).or_default();
        if entry.initial_text() == Some(text) {
            return Ok(());
        }
        let was_visible = !entry.is_empty();

        // Classify and parse before touching any state.
        let is_formula = text.starts_with('=') && text.len() >= 2;
        let parsed = if is_formula {
            let expr = parser::parse(&text[1..])?;
            let refs = parser::referenced_cells(&expr);
            if self.deps.would_create_cycle(pos, &refs) {
                debug!("rejected formula at {pos}: would create a cycle");
                return Err(GridError::CircularDependency(pos));
            }
            Some((expr, refs))
        } else {
            None
        };

        // Dependents must observe a clean slate before edges move.
        self.invalidate_from(pos);

        match parsed {
            Some((expr, refs)) => {
                let valid: FxHashSet<Position> =
                    refs.iter().copied().filter(|p| p.is_valid()).collect();
                // Referenced cells materialize (invisibly) so reverse edges
                // always have an owner.
                for &target in &valid {
                    self.cells.entry(target).or_default();
                }
                self.deps.replace_edges(pos, valid);
                if let Some(cell) = self.cells.get_mut(&pos) {
                    cell.install_formula(text.to_string(), expr, refs);
                }
            }
            None => {
                self.deps.clear_cell(pos);
                if let Some(cell) = self.cells.get_mut(&pos) {
                    cell.install_text(text.to_string());
                }
            }
        }

        if !was_visible {
            *self.row_counts.entry(pos.row).or_insert(0) += 1;
            *self.col_counts.entry(pos.col).or_insert(0) += 1;
        }
        debug!("set {pos}");
        Ok(())
    }

    /// Revert the cell at `pos` to Empty.
    ///
    /// The entry stays in the map so formulas referencing it keep a valid
    /// target; it just becomes invisible again. Clearing a position with no
    /// visible cell is a no-op.
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), GridError> {
        if !pos.is_valid() {
            return Err(GridError::InvalidPosition(pos));
        }
        let visible = self.cells.get(&pos).is_some_and(|c| !c.is_empty());
        if !visible {
            return Ok(());
        }

        if let Some(n) = self.row_counts.get_mut(&pos.row) {
            *n -= 1;
            if *n == 0 {
                self.row_counts.remove(&pos.row);
            }
        }
        if let Some(n) = self.col_counts.get_mut(&pos.col) {
            *n -= 1;
            if *n == 0 {
                self.col_counts.remove(&pos.col);
            }
        }

        self.invalidate_from(pos);
        // Symmetric with set: the cell's outgoing edges die with its formula.
        self.deps.clear_cell(pos);
        if let Some(cell) = self.cells.get_mut(&pos) {
            cell.set_empty();
        }
        debug!("cleared {pos}");
        Ok(())
    }

    /// The externally visible cell at `pos`, or `None`.
    ///
    /// Entries that exist only because a formula references them (or were
    /// cleared) are not visible here.
    pub fn cell(&self, pos: Position) -> Result<Option<CellRef<'_>>, GridError> {
        if !pos.is_valid() {
            return Err(GridError::InvalidPosition(pos));
        }
        Ok(self
            .cells
            .get(&pos)
            .filter(|c| !c.is_empty())
            .map(|cell| CellRef { grid: self, cell }))
    }

    /// Any entry at `pos`, visible or not. Internal to the edit pipeline.
    pub(crate) fn concrete_cell(&self, pos: Position) -> Option<&Cell> {
        self.cells.get(&pos)
    }

    // =========================================================================
    // Printable area
    // =========================================================================

    /// The minimal rectangle covering all externally visible cells,
    /// or (0, 0) when there are none.
    pub fn printable_size(&self) -> Size {
        match (
            self.row_counts.last_key_value(),
            self.col_counts.last_key_value(),
        ) {
            (Some((&row, _)), Some((&col, _))) => Size::new(row + 1, col + 1),
            _ => Size::default(),
        }
    }

    /// Dump computed values for the printable rectangle: cells separated by
    /// a tab within a row, rows terminated by a newline.
    pub fn print_values<W: Write>(&self, out: &mut W) -> fmt::Result {
        self.print_cells(out, |cell| cell.value(self).to_string())
    }

    /// Dump cell texts in the same layout as [`Grid::print_values`].
    pub fn print_texts<W: Write>(&self, out: &mut W) -> fmt::Result {
        self.print_cells(out, |cell| cell.text())
    }

    fn print_cells<W, F>(&self, out: &mut W, render: F) -> fmt::Result
    where
        W: Write,
        F: Fn(&Cell) -> String,
    {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col != 0 {
                    out.write_char('\t')?;
                }
                if let Some(cell) = self.cells.get(&Position::new(row, col)) {
                    out.write_str(&render(cell))?;
                }
            }
            out.write_char('\n')?;
        }
        Ok(())
    }

    /// Clear the value cache of `start` and every transitive dependent.
    ///
    /// Dependents form a DAG, but the worklist keeps a visited set anyway so
    /// diamonds are not re-walked.
    fn invalidate_from(&self, start: Position) {
        let mut visited = FxHashSet::default();
        let mut stack = vec![start];
        while let Some(pos) = stack.pop() {
            if !visited.insert(pos) {
                continue;
            }
            if let Some(cell) = self.cells.get(&pos) {
                cell.clear_cache();
            }
            stack.extend(self.deps.dependents(pos));
        }
        trace!("invalidated {} cached values from {start}", visited.len());
    }
}

impl CellLookup for Grid {
    fn value_at(&self, pos: Position) -> Value {
        match self.concrete_cell(pos) {
            Some(cell) => cell.value(self),
            None => Value::Text(String::new()),
        }
    }
}
