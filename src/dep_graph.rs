//! Bidirectional reference graph between cells.
//!
//! Tracks forward references (cells a formula names) and dependents (cells
//! whose formulas name a given cell) for cycle detection and cache
//! invalidation.
//!
//! # Edge Direction
//!
//! ```text
//! A → B  means  "A's formula references B"
//! ```
//!
//! Dependents are the reverse index: "what must be invalidated if B
//! changes?" is one lookup.
//!
//! Nodes are [`Position`]s, not cell handles: positions are stable keys
//! whose validity equals the lifetime of the owning grid entry.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::position::Position;

/// Dependency graph for formula cells.
///
/// Maintains bidirectional adjacency for O(1) lookups:
/// - `refs[A]` = cells A's formula references (forward edges)
/// - `deps[B]` = cells whose formulas reference B (reverse edges)
///
/// # Invariants
///
/// 1. **Bidirectional consistency:** If B ∈ refs[A] then A ∈ deps[B], and
///    vice versa.
/// 2. **No dangling entries:** Empty sets are removed, not stored.
/// 3. **No duplicate edges:** Set semantics enforced by FxHashSet.
/// 4. **Atomic updates:** `replace_edges` is the only mutator that touches
///    both maps.
#[derive(Default, Debug, Clone)]
pub struct DepGraph {
    /// Forward references: for each formula cell A, the cells it names.
    refs: FxHashMap<Position, FxHashSet<Position>>,

    /// Dependents: for each referenced cell B, the formula cells naming it.
    deps: FxHashMap<Position, FxHashSet<Position>>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cells this cell's formula references (forward edges).
    pub fn references(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.refs
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// The cells whose formulas reference this cell (reverse edges).
    pub fn dependents(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.deps
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// True if this cell has forward edges tracked in the graph.
    pub fn is_formula_cell(&self, cell: Position) -> bool {
        self.refs.contains_key(&cell)
    }

    /// Replace all forward edges for a cell atomically.
    ///
    /// This is the primary mutation API. It:
    /// 1. Removes the cell from all its old targets' dependent sets
    /// 2. Clears the cell's forward set
    /// 3. Adds the cell to all new targets' dependent sets
    /// 4. Stores the cell's new forward set
    ///
    /// Pass an empty set to clear all edges for this cell.
    pub fn replace_edges(&mut self, cell: Position, new_refs: FxHashSet<Position>) {
        if let Some(old_refs) = self.refs.remove(&cell) {
            for target in old_refs {
                if let Some(deps) = self.deps.get_mut(&target) {
                    deps.remove(&cell);
                    // Clean up empty entries (invariant: no dangling)
                    if deps.is_empty() {
                        self.deps.remove(&target);
                    }
                }
            }
        }

        if new_refs.is_empty() {
            return;
        }

        for target in &new_refs {
            self.deps.entry(*target).or_default().insert(cell);
        }
        self.refs.insert(cell, new_refs);
    }

    /// Clear all forward edges for a cell (formula removed or cell cleared).
    ///
    /// Convenience wrapper around `replace_edges` with an empty set. Reverse
    /// edges *into* the cell are untouched: other formulas still name it.
    pub fn clear_cell(&mut self, cell: Position) {
        self.replace_edges(cell, FxHashSet::default());
    }

    /// Check whether installing `prospective` as `cell`'s forward references
    /// would close a cycle. Does not modify the graph.
    ///
    /// # Algorithm
    ///
    /// For each prospective reference `p`: naming `cell` itself is a cycle;
    /// otherwise walk forward edges from `p` with a visited set, and
    /// reaching `cell` is a cycle. Out-of-range references are skipped, and
    /// positions with no forward edges are dead ends.
    pub fn would_create_cycle(&self, cell: Position, prospective: &[Position]) -> bool {
        for &p in prospective {
            if !p.is_valid() {
                continue;
            }
            if p == cell {
                return true;
            }

            let mut visited = FxHashSet::default();
            let mut stack = vec![p];
            while let Some(current) = stack.pop() {
                if !visited.insert(current) {
                    continue;
                }
                if let Some(next) = self.refs.get(&current) {
                    for &target in next {
                        if target == cell {
                            return true;
                        }
                        stack.push(target);
                    }
                }
            }
        }
        false
    }

    /// Check all invariants. Panics if any are violated.
    ///
    /// Only available in test builds.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        for (cell, refs) in &self.refs {
            for target in refs {
                assert!(
                    self.deps.get(target).is_some_and(|s| s.contains(cell)),
                    "Missing dep edge: {} should have {} in dependents",
                    target,
                    cell
                );
            }
        }

        for (cell, deps) in &self.deps {
            for dep in deps {
                assert!(
                    self.refs.get(dep).is_some_and(|s| s.contains(cell)),
                    "Missing ref edge: {} should have {} in references",
                    dep,
                    cell
                );
            }
        }

        for (cell, refs) in &self.refs {
            assert!(!refs.is_empty(), "Empty refs set stored for {}", cell);
        }
        for (cell, deps) in &self.deps {
            assert!(!deps.is_empty(), "Empty deps set stored for {}", cell);
        }
    }
}
