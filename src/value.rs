//! Computed cell values and evaluation-error tags.

use serde::{Deserialize, Serialize};

/// Error produced by formula evaluation.
///
/// These are data, not failures: they flow through dependent formulas and
/// are cached and invalidated like any other computed value. The grid treats
/// them as opaque tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellError {
    /// Reference to a position outside the grid bounds.
    Ref,
    /// Arithmetic on a value that cannot be read as a number.
    Value,
    /// Division by zero.
    Div0,
}

impl CellError {
    /// The short display tag for this error.
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Ref => "#REF!",
            CellError::Value => "#VALUE!",
            CellError::Div0 => "#DIV/0!",
        }
    }
}

impl std::fmt::Display for CellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The computed value of a cell: a number, a text string, or an error tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
    Error(CellError),
}

impl Value {
    /// Coerce to a number the way the evaluator reads referenced cells:
    /// empty text is zero, numeric text parses, anything else is `#VALUE!`,
    /// and errors propagate.
    pub fn to_number(&self) -> Result<f64, CellError> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Text(s) if s.is_empty() => Ok(0.0),
            Value::Text(s) => s.parse::<f64>().map_err(|_| CellError::Value),
            Value::Error(e) => Err(*e),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Text(s) => f.write_str(s),
            Value::Error(e) => write!(f, "{}", e),
        }
    }
}

/// Format a number for display: integral doubles print without a fractional
/// part (`5`, not `5.0`).
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_tags() {
        assert_eq!(CellError::Ref.to_string(), "#REF!");
        assert_eq!(CellError::Value.to_string(), "#VALUE!");
        assert_eq!(CellError::Div0.to_string(), "#DIV/0!");
    }

    #[test]
    fn test_to_number_coercion() {
        assert_eq!(Value::Number(2.5).to_number(), Ok(2.5));
        assert_eq!(Value::Text(String::new()).to_number(), Ok(0.0));
        assert_eq!(Value::Text("42".into()).to_number(), Ok(42.0));
        assert_eq!(Value::Text("-1.5".into()).to_number(), Ok(-1.5));
        assert_eq!(Value::Text("abc".into()).to_number(), Err(CellError::Value));
        assert_eq!(Value::Error(CellError::Div0).to_number(), Err(CellError::Div0));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(5.0).to_string(), "5");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-3.0).to_string(), "-3");
        assert_eq!(Value::Text("hello".into()).to_string(), "hello");
        assert_eq!(Value::Error(CellError::Ref).to_string(), "#REF!");
    }
}
