//! Error types for the nvmefs harness
//!
//! This module defines all error types used throughout the harness.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! # Categories
//!
//! | Category | Variants | Raised by |
//! |----------|----------|-----------|
//! | Device administration | `DeviceQuery`, `DeviceConfig`, `Namespace`, `Deallocation` | device lifecycle manager |
//! | Lifecycle | `InvalidState` | provisioning on a torn-down device |
//! | Process | `CommandSpawn` | command executor |
//! | Reference data | `SchemaMismatch`, `ValidationFailure` | parser / validator |
//! | Collaborators | `Engine`, `Config`, `Io` | engine connection, config loading |

use crate::value::Divergence;
use std::io;
use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the nvmefs harness
#[derive(Debug, Error)]
pub enum Error {
    /// The identity query failed or its capacity field could not be read
    #[error("device query failed for {device}: {reason}")]
    DeviceQuery {
        /// Device path the query was issued against
        device: String,
        /// Why the capacity could not be determined
        reason: String,
    },

    /// A device-wide feature toggle failed
    #[error("device config failed for {device}: {feature} exited with {status}")]
    DeviceConfig {
        /// Device path
        device: String,
        /// Feature that was being set
        feature: String,
        /// Exit status rendered for display
        status: String,
    },

    /// Namespace create, attach or delete failed
    #[error("namespace {op} failed for {device} nsid {namespace_id}: {reason}")]
    Namespace {
        /// Device path
        device: String,
        /// Namespace identifier
        namespace_id: u32,
        /// `create`, `attach` or `delete`
        op: &'static str,
        /// Exit status and captured stderr
        reason: String,
    },

    /// Dataset-management deallocation failed
    #[error("deallocation failed for {device} nsid {namespace_id}: {reason}")]
    Deallocation {
        /// Device path
        device: String,
        /// Namespace identifier
        namespace_id: u32,
        /// Exit status and captured stderr
        reason: String,
    },

    /// Operation not permitted in the device's current provisioning state
    #[error("cannot {op} on {device}: device is {state}")]
    InvalidState {
        /// Device path
        device: String,
        /// Current provisioning state
        state: String,
        /// Operation that was refused
        op: &'static str,
    },

    /// An external command could not be started at all
    #[error("failed to spawn {program}: {reason}")]
    CommandSpawn {
        /// Program name
        program: String,
        /// OS error text
        reason: String,
    },

    /// Reference text does not fit the column schema
    #[error("schema mismatch at line {line}{}: {reason}", column_suffix(.column))]
    SchemaMismatch {
        /// 1-based line number inside the reference text (header is line 1)
        line: usize,
        /// 0-based column, when the failure is tied to a single field
        column: Option<usize>,
        /// What did not match
        reason: String,
    },

    /// Produced rows differ from the reference rows
    #[error("validation failed: {0}")]
    ValidationFailure(Box<Divergence>),

    /// Error reported by the engine collaborator
    #[error("engine error: {0}")]
    Engine(String),

    /// Configuration could not be read or is invalid
    #[error("config error: {0}")]
    Config(String),

    /// I/O error (file operations, device node probes, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn column_suffix(column: &Option<usize>) -> String {
    match column {
        Some(c) => format!(", column {c}"),
        None => String::new(),
    }
}

impl Error {
    /// Create an engine error from anything displayable
    pub fn engine(reason: impl Into<String>) -> Self {
        Error::Engine(reason.into())
    }

    /// Create a configuration error from anything displayable
    pub fn config(reason: impl Into<String>) -> Self {
        Error::Config(reason.into())
    }

    /// Returns true for failures of the external device administration interface
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Error::DeviceQuery { .. }
                | Error::DeviceConfig { .. }
                | Error::Namespace { .. }
                | Error::Deallocation { .. }
                | Error::CommandSpawn { .. }
        )
    }
}
