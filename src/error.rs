//! Structural errors raised from grid entry points.
//!
//! These abort the operation that raised them and leave the grid unchanged.
//! Evaluation errors are not represented here; they are values
//! (see [`crate::value::CellError`]).

use thiserror::Error;

use crate::formula::parser::FormulaError;
use crate::position::Position;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("position {0} is out of range")]
    InvalidPosition(Position),

    #[error("formula at {0} would create a circular dependency")]
    CircularDependency(Position),

    #[error(transparent)]
    Formula(#[from] FormulaError),
}
