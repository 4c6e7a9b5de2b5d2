//! Result validator
//!
//! Compares rows produced by a query against the parsed reference answer:
//! positionally, tuple by tuple, with native element equality. Row order is
//! significant and nothing is sorted, so queries without a deterministic
//! `ORDER BY` cannot be validated this way.
//!
//! Floats compare exactly. Reference answers print floats rounded, so a
//! workload whose result goes through float arithmetic can diverge in the
//! last digit; use a decimal column for those where possible.

use nvmefs_core::{Divergence, Error, Result, Row};

/// Outcome of one validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// Every row matched
    Pass,
    /// First point where the results diverge
    Fail(Divergence),
}

impl ValidationOutcome {
    /// Whether every row matched
    pub fn is_pass(&self) -> bool {
        matches!(self, ValidationOutcome::Pass)
    }

    /// The divergence, if validation failed
    pub fn divergence(&self) -> Option<&Divergence> {
        match self {
            ValidationOutcome::Pass => None,
            ValidationOutcome::Fail(divergence) => Some(divergence),
        }
    }

    /// `Ok(())` on pass, [`Error::ValidationFailure`] otherwise
    pub fn into_result(self) -> Result<()> {
        match self {
            ValidationOutcome::Pass => Ok(()),
            ValidationOutcome::Fail(divergence) => {
                Err(Error::ValidationFailure(Box::new(divergence)))
            }
        }
    }
}

/// Compare `actual` rows against `expected` rows.
///
/// The divergence names the first differing row and, when both rows exist
/// but differ, the first differing column. A row-count mismatch diverges at
/// the first row present on only one side.
pub fn validate(actual: &[Row], expected: &[Row]) -> ValidationOutcome {
    for (index, (got, want)) in actual.iter().zip(expected).enumerate() {
        if got == want {
            continue;
        }
        let column = got
            .iter()
            .zip(want)
            .position(|(a, e)| a != e)
            .unwrap_or_else(|| got.len().min(want.len()));
        return ValidationOutcome::Fail(Divergence {
            row: index,
            column: Some(column),
            expected: Some(want.clone()),
            actual: Some(got.clone()),
        });
    }

    if actual.len() != expected.len() {
        let row = actual.len().min(expected.len());
        return ValidationOutcome::Fail(Divergence {
            row,
            column: None,
            expected: expected.get(row).cloned(),
            actual: actual.get(row).cloned(),
        });
    }
    ValidationOutcome::Pass
}
