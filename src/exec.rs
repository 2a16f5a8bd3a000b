//! External command execution.
//!
//! Store and service implementations talk to the host exclusively through
//! the [`Executor`] trait so they can be unit-tested with a scripted mock.

use anyhow::{Context, Result, bail};
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Runs external programs.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run a command and return its output. Fails if the command exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned or exits non-zero.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command, allowing failure (returns the result without bailing).
    ///
    /// # Errors
    ///
    /// Returns an error only if the program cannot be spawned.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Check if a program is available on `PATH`.
    fn which(&self, program: &str) -> bool;
}

/// [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        execute_checked(cmd, program)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;

        Ok(ExecResult::from(output))
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Execute a command and return the result, bailing on non-zero exit.
fn execute_checked(mut cmd: Command, label: &str) -> Result<ExecResult> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to execute: {label}"))?;
    let result = ExecResult::from(output);
    if !result.success {
        bail!(
            "{label} failed (exit {}): {}",
            result.code.unwrap_or(-1),
            result.stderr.trim()
        );
    }
    Ok(result)
}

/// Render a command line for logs and dry-run output.
///
/// Arguments containing whitespace are single-quoted.
#[must_use]
pub fn render_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .map(|part| {
            if part.is_empty() || part.chars().any(char::is_whitespace) {
                format!("'{}'", part.replace('\'', "'\\''"))
            } else {
                part.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Shared test helpers for executor-driven unit tests.
#[cfg(test)]
pub mod test_helpers {
    use super::{ExecResult, Executor, render_command};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// A scripted executor.
    ///
    /// Maintains a queue of canned [`ExecResult`]s consumed in FIFO order and
    /// records every command line it is asked to run.  When the queue is
    /// empty any call returns a failed result with stderr `"unexpected call"`.
    #[derive(Debug, Default)]
    pub struct MockExecutor {
        responses: Mutex<VecDeque<ExecResult>>,
        calls: Mutex<Vec<String>>,
        which_result: bool,
    }

    impl MockExecutor {
        /// Create a mock from an ordered list of results.
        #[must_use]
        pub fn with_results(results: Vec<ExecResult>) -> Self {
            Self {
                responses: Mutex::new(results.into()),
                calls: Mutex::new(Vec::new()),
                which_result: false,
            }
        }

        /// Set the value returned by every [`Executor::which`] call.
        #[must_use]
        pub const fn with_which(mut self, result: bool) -> Self {
            self.which_result = result;
            self
        }

        /// Every command line issued so far, in order.
        #[must_use]
        pub fn calls(&self) -> Vec<String> {
            self.calls
                .lock()
                .map_or_else(|_| Vec::new(), |guard| guard.clone())
        }

        fn next(&self, program: &str, args: &[&str]) -> ExecResult {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(render_command(program, args));
            }
            self.responses
                .lock()
                .ok()
                .and_then(|mut guard| guard.pop_front())
                .unwrap_or_else(|| fail("unexpected call"))
        }
    }

    /// A successful result with the given stdout.
    #[must_use]
    pub fn ok(stdout: &str) -> ExecResult {
        ExecResult {
            stdout: stdout.to_string(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }

    /// A failed result (exit 1) with the given stderr.
    #[must_use]
    pub fn fail(stderr: &str) -> ExecResult {
        ExecResult {
            stdout: String::new(),
            stderr: stderr.to_string(),
            success: false,
            code: Some(1),
        }
    }

    impl Executor for MockExecutor {
        fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
            let result = self.next(program, args);
            if result.success {
                Ok(result)
            } else {
                anyhow::bail!("{program} failed: {}", result.stderr)
            }
        }

        fn run_unchecked(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
            Ok(self.next(program, args))
        }

        fn which(&self, _: &str) -> bool {
            self.which_result
        }
    }
}
