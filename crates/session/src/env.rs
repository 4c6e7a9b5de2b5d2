//! Scoped environment toggles

use std::ffi::OsString;

/// Sets an environment variable to `"1"` and restores the previous value on drop.
///
/// Used to switch on huge-page allocation while a driver-bypass transport is
/// in use. The process environment is global, so overlapping toggles on the
/// same variable must be dropped in reverse order.
#[derive(Debug)]
pub struct EnvToggle {
    key: String,
    previous: Option<OsString>,
}

impl EnvToggle {
    /// Set `key=1`, remembering the previous value
    pub fn enable(key: impl Into<String>) -> Self {
        let key = key.into();
        let previous = std::env::var_os(&key);
        std::env::set_var(&key, "1");
        tracing::debug!(target: "nvmefs::session", key = %key, "environment toggle on");
        Self { key, previous }
    }

    /// Variable this toggle controls
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for EnvToggle {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => std::env::set_var(&self.key, value),
            None => std::env::remove_var(&self.key),
        }
        tracing::debug!(target: "nvmefs::session", key = %self.key, "environment toggle restored");
    }
}
