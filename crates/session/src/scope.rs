//! Fixture scopes

use std::fmt;

/// Lifetime of an acquisition.
///
/// Module and session acquisitions are shared read/write by every test in
/// that scope. Nothing arbitrates access to the physical device: only one
/// acquisition may touch a device at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixtureScope {
    /// One test function
    Test,
    /// All tests in one module
    Module,
    /// The whole run
    Session,
}

impl FixtureScope {
    /// Whether acquisitions in this scope provision the device unless told otherwise.
    ///
    /// Test-scoped acquisitions run on whatever an enclosing scope provisioned.
    pub fn provisions_by_default(self) -> bool {
        matches!(self, FixtureScope::Module | FixtureScope::Session)
    }
}

impl fmt::Display for FixtureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FixtureScope::Test => "test",
            FixtureScope::Module => "module",
            FixtureScope::Session => "session",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outer_scopes_provision() {
        assert!(!FixtureScope::Test.provisions_by_default());
        assert!(FixtureScope::Module.provisions_by_default());
        assert!(FixtureScope::Session.provisions_by_default());
        assert_eq!(FixtureScope::Module.to_string(), "module");
    }
}
