//! # nvmefs reference validation
//!
//! Parses typed reference answers and compares them against rows produced
//! by the engine under constrained memory budgets.
//!
//! ```text
//! let schema: ColumnSchema = "int,date,decimal,int".parse()?;
//! let expected = parse("header\n1|2024-01-01|3.50|7\n", &schema)?;
//! validate(&actual, &expected).into_result()?;
//! ```

#![warn(missing_docs)]

mod parser;
mod schema;
mod validator;

pub mod tpch;

pub use parser::{coerce, parse, DATE_FORMAT, FIELD_SEPARATOR};
pub use schema::{ColumnSchema, ColumnType};
pub use tpch::{ReferenceWorkload, WorkloadReport};
pub use validator::{validate, ValidationOutcome};
