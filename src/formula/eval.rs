// Formula evaluator - computes an Expr against a read-only grid lookup

use crate::position::Position;
use crate::value::{CellError, Value};

use super::parser::{BinaryOp, Expr, UnaryOp};

/// Read-only cell access for formula evaluation.
///
/// Implementations must not mutate the grid; evaluation may re-enter the
/// lookup recursively while dependent caches are being filled.
pub trait CellLookup {
    /// Current value of the cell at `pos`. Positions without a cell yield
    /// empty text.
    fn value_at(&self, pos: Position) -> Value;
}

/// Evaluate an expression to a number.
///
/// Referenced cells coerce through [`Value::to_number`]: empty cells read as
/// zero, numeric text parses, non-numeric text is `#VALUE!`, and errors in
/// referenced cells propagate. Out-of-range references are `#REF!`; division
/// by zero is `#DIV/0!`.
pub fn evaluate(expr: &Expr, lookup: &dyn CellLookup) -> Result<f64, CellError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Ref(pos) => {
            if !pos.is_valid() {
                return Err(CellError::Ref);
            }
            lookup.value_at(*pos).to_number()
        }
        Expr::Unary { op: UnaryOp::Neg, operand } => Ok(-evaluate(operand, lookup)?),
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, lookup)?;
            let right = evaluate(right, lookup)?;
            match op {
                BinaryOp::Add => Ok(left + right),
                BinaryOp::Sub => Ok(left - right),
                BinaryOp::Mul => Ok(left * right),
                BinaryOp::Div => {
                    if right == 0.0 {
                        Err(CellError::Div0)
                    } else {
                        Ok(left / right)
                    }
                }
                BinaryOp::Pow => Ok(left.powf(right)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap;

    use super::*;
    use crate::formula::parser::parse;

    /// Fixed-value lookup for evaluator tests.
    #[derive(Default)]
    struct MapLookup(FxHashMap<Position, Value>);

    impl MapLookup {
        fn with(mut self, a1: &str, value: Value) -> Self {
            self.0.insert(Position::from_a1(a1).unwrap(), value);
            self
        }
    }

    impl CellLookup for MapLookup {
        fn value_at(&self, pos: Position) -> Value {
            self.0
                .get(&pos)
                .cloned()
                .unwrap_or_else(|| Value::Text(String::new()))
        }
    }

    fn eval(src: &str, lookup: &MapLookup) -> Result<f64, CellError> {
        evaluate(&parse(src).unwrap(), lookup)
    }

    #[test]
    fn test_arithmetic() {
        let lookup = MapLookup::default();
        assert_eq!(eval("1+2*3", &lookup), Ok(7.0));
        assert_eq!(eval("(1+2)*3", &lookup), Ok(9.0));
        assert_eq!(eval("10-4/2", &lookup), Ok(8.0));
        assert_eq!(eval("2^10", &lookup), Ok(1024.0));
        assert_eq!(eval("-2^2", &lookup), Ok(4.0));
        assert_eq!(eval("-(2^2)", &lookup), Ok(-4.0));
    }

    #[test]
    fn test_division_by_zero() {
        let lookup = MapLookup::default();
        assert_eq!(eval("1/0", &lookup), Err(CellError::Div0));
        assert_eq!(eval("1/(2-2)", &lookup), Err(CellError::Div0));
    }

    #[test]
    fn test_reference_values() {
        let lookup = MapLookup::default()
            .with("A1", Value::Number(2.0))
            .with("A2", Value::Text("40".into()))
            .with("A3", Value::Text("oops".into()));

        assert_eq!(eval("A1+3", &lookup), Ok(5.0));
        assert_eq!(eval("A1+A2", &lookup), Ok(42.0));
        assert_eq!(eval("A3+1", &lookup), Err(CellError::Value));
        // Never-set cells read as empty text, which is zero
        assert_eq!(eval("B1+1", &lookup), Ok(1.0));
    }

    #[test]
    fn test_error_propagates_from_referenced_cell() {
        let lookup = MapLookup::default().with("A1", Value::Error(CellError::Div0));
        assert_eq!(eval("A1+1", &lookup), Err(CellError::Div0));
    }

    #[test]
    fn test_out_of_range_reference() {
        let lookup = MapLookup::default();
        assert_eq!(eval("A99999", &lookup), Err(CellError::Ref));
    }
}
