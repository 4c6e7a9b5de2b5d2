//! Core types for the nvmefs harness
//!
//! This crate defines the foundational types shared by every harness crate:
//! - Error: the harness error taxonomy
//! - Value / Row: typed cells compared during validation
//! - Divergence: first mismatch between produced and reference rows
//! - Limits: fixed device and workload parameters
//! - HarnessConfig: `nvmefs-harness.toml`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod limits;
pub mod value;

pub use config::{HarnessConfig, CONFIG_FILE_NAME};
pub use error::{Error, Result};
pub use value::{format_row, Divergence, Row, Value};

// Re-exported so downstream crates build values without extra dependencies
pub use chrono::NaiveDate;
pub use rust_decimal::Decimal;
