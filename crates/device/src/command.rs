//! Command executor for out-of-process administrative actions
//!
//! A [`CommandRunner`] runs one external program to completion and hands back
//! its exit status and captured output. A nonzero exit is *not* an error at
//! this layer; only failing to start the process is. Callers decide what a
//! given status means for their operation.
//!
//! There are no retries: device administration is not idempotent under retry
//! (re-attaching an attached namespace fails), and there is no timeout, so a
//! hung command blocks the caller.

use nvmefs_core::{Error, Result};
use std::process::Command;

/// Exit status and captured output of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` if the process was terminated by a signal
    pub status: Option<i32>,
    /// Captured standard output
    pub stdout: Vec<u8>,
    /// Captured standard error
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// A successful run with the given stdout
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// A failed run with the given exit code and stderr
    pub fn failure(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Some(code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    /// True when the process exited with status 0
    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }

    /// Stdout decoded lossily as UTF-8
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Human-readable status plus trimmed stderr, for error messages
    pub fn describe_failure(&self) -> String {
        let status = match self.status {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        };
        let stderr = String::from_utf8_lossy(&self.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            status
        } else {
            format!("{status}: {stderr}")
        }
    }
}

/// Runs external programs synchronously.
///
/// Implementations must block until the program exits.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and return its status and output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandSpawn`] only when the process cannot be started.
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        (**self).run(program, args)
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<R> {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        (**self).run(program, args)
    }
}

/// [`CommandRunner`] backed by `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        tracing::debug!(
            target: "nvmefs::command",
            program,
            args = %args.join(" "),
            "running admin command"
        );

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| Error::CommandSpawn {
                program: program.to_string(),
                reason: e.to_string(),
            })?;

        let result = CommandOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        };

        if !result.is_success() {
            tracing::warn!(
                target: "nvmefs::command",
                program,
                args = %args.join(" "),
                status = ?result.status,
                "admin command exited unsuccessfully"
            );
        }

        Ok(result)
    }
}
