//! A single grid entry: empty, plain text, or a formula, plus a memoized
//! value cache.
//!
//! The cache is interior-mutable so value reads stay `&self`; the grid
//! clears it (transitively, through dependents) whenever an edit can change
//! the outcome.

use std::cell::RefCell;

use crate::formula::eval::{self, CellLookup};
use crate::formula::parser::{self, Expr};
use crate::position::Position;
use crate::value::Value;

/// Content forms. Exactly one is active at a time.
#[derive(Debug, Clone)]
enum CellContent {
    Empty,
    Text(String),
    Formula {
        /// The raw input, including the leading `=`. Kept for the
        /// same-text short circuit on re-assignment.
        raw: String,
        expr: Expr,
        /// Positions the formula names, sorted and deduplicated, including
        /// out-of-range ones.
        refs: Vec<Position>,
    },
}

#[derive(Debug, Clone)]
pub struct Cell {
    content: CellContent,
    cache: RefCell<Option<Value>>,
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

impl Cell {
    pub fn new() -> Self {
        Self {
            content: CellContent::Empty,
            cache: RefCell::new(None),
        }
    }

    /// True iff the form is Empty (never set, or cleared).
    pub fn is_empty(&self) -> bool {
        matches!(self.content, CellContent::Empty)
    }

    /// The raw input this cell was last set to. Empty cells have none.
    pub fn initial_text(&self) -> Option<&str> {
        match &self.content {
            CellContent::Empty => None,
            CellContent::Text(t) => Some(t),
            CellContent::Formula { raw, .. } => Some(raw),
        }
    }

    /// The positions the current formula references; empty for Empty/Text.
    pub fn referenced_cells(&self) -> &[Position] {
        match &self.content {
            CellContent::Formula { refs, .. } => refs,
            _ => &[],
        }
    }

    /// The cell's text form: verbatim input for plain text, the canonical
    /// re-emission (with leading `=`) for formulas.
    pub fn text(&self) -> String {
        match &self.content {
            CellContent::Empty => String::new(),
            CellContent::Text(t) => t.clone(),
            CellContent::Formula { expr, .. } => format!("={}", parser::format_expr(expr)),
        }
    }

    /// The cell's computed value, memoized until the grid invalidates it.
    ///
    /// Plain text strips a leading `'` escape marker; formulas evaluate
    /// through `lookup`, and evaluation errors are cached like any value.
    pub fn value(&self, lookup: &dyn CellLookup) -> Value {
        if let Some(cached) = self.cache.borrow().clone() {
            return cached;
        }

        let value = match &self.content {
            CellContent::Empty => Value::Text(String::new()),
            CellContent::Text(t) => {
                let shown = t.strip_prefix('\'').unwrap_or(t);
                Value::Text(shown.to_string())
            }
            CellContent::Formula { expr, .. } => match eval::evaluate(expr, lookup) {
                Ok(n) => Value::Number(n),
                Err(e) => Value::Error(e),
            },
        };

        *self.cache.borrow_mut() = Some(value.clone());
        value
    }

    /// Drop the memoized value. The next read recomputes.
    pub fn clear_cache(&self) {
        *self.cache.borrow_mut() = None;
    }

    pub(crate) fn install_text(&mut self, raw: String) {
        self.content = CellContent::Text(raw);
    }

    pub(crate) fn install_formula(&mut self, raw: String, expr: Expr, refs: Vec<Position>) {
        self.content = CellContent::Formula { raw, expr, refs };
    }

    pub(crate) fn set_empty(&mut self) {
        self.content = CellContent::Empty;
    }
}
