//! Typed cell values produced by the engine and by the reference parser
//!
//! A [`Row`] is an ordered tuple of [`Value`]s. Both sides of a validation
//! (live query output and parsed reference answers) are expressed in these
//! types so comparison is a plain positional `==`.
//!
//! ## Equality
//!
//! Equality is variant-strict: `Int(1)` never equals `Decimal(1)`. Within a
//! variant the native equality of the payload applies:
//! - `Decimal` compares numerically (`3.50 == 3.5`), never through binary floats
//! - `Float` compares exactly, so `NaN != NaN`
//! - `Date` and `Text` compare exactly

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered tuple of values
pub type Row = Vec<Value>;

/// A single typed cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL
    Null,
    /// 64-bit signed integer
    Int(i64),
    /// Exact base-10 decimal
    Decimal(Decimal),
    /// Binary floating point
    Float(f64),
    /// Calendar date
    Date(NaiveDate),
    /// Character data
    Text(String),
}

impl Value {
    /// Create a text value
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Name of the variant, used in mismatch reports
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Float(_) => "float",
            Value::Date(_) => "date",
            Value::Text(_) => "text",
        }
    }

    /// Borrow the text payload, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Render a row as `(a, b, c)` for diagnostics
pub fn format_row(row: &[Value]) -> String {
    let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
    format!("({})", cells.join(", "))
}

/// First point where produced rows and reference rows disagree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    /// 0-based row index
    pub row: usize,
    /// 0-based column index; `None` when the row is missing on one side
    pub column: Option<usize>,
    /// Reference row, `None` if the reference ran out of rows
    pub expected: Option<Row>,
    /// Produced row, `None` if the workload ran out of rows
    pub actual: Option<Row>,
}

impl Divergence {
    /// Expected cell at the diverging column, if both are known
    pub fn expected_value(&self) -> Option<&Value> {
        let col = self.column?;
        self.expected.as_ref()?.get(col)
    }

    /// Produced cell at the diverging column, if both are known
    pub fn actual_value(&self) -> Option<&Value> {
        let col = self.column?;
        self.actual.as_ref()?.get(col)
    }
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |row: &Option<Row>| match row {
            Some(r) => format_row(r),
            None => "<missing>".to_string(),
        };
        match self.column {
            Some(col) => write!(
                f,
                "row {}, column {}: expected {}, got {}",
                self.row,
                col,
                side(&self.expected),
                side(&self.actual)
            ),
            None => write!(
                f,
                "row {}: expected {}, got {}",
                self.row,
                side(&self.expected),
                side(&self.actual)
            ),
        }
    }
}
