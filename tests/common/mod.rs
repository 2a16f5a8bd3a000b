// Shared helpers for integration tests.
//
// Provides a temporary plan file, a scripted executor, and a recording
// service controller so each integration test can drive the engine without
// touching the host's preferences.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use macprefs_cli::config::Config;
use macprefs_cli::directive::RestartTarget;
use macprefs_cli::error::PrefError;
use macprefs_cli::exec::{ExecResult, Executor, render_command};
use macprefs_cli::logging::{EntryStatus, Log};
use macprefs_cli::services::{RestartStatus, ServiceControl};

/// A plan file in its own temporary directory.
pub struct PlanFile {
    dir: tempfile::TempDir,
    path: PathBuf,
}

impl PlanFile {
    /// Write `content` to `plans.toml` in a fresh temporary directory.
    pub fn new(content: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("plans.toml");
        std::fs::write(&path, content).expect("write plans.toml");
        Self { dir, path }
    }

    /// A path inside a fresh temporary directory where no file exists.
    pub fn missing() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("plans.toml");
        Self { dir, path }
    }

    /// Path to the plan file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the plan file through the public config API.
    pub fn load(&self) -> Config {
        Config::load(&self.path).expect("load plan file")
    }
}

/// Executor answering from a queue of canned results and recording every
/// command line. An exhausted queue answers with success.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: Mutex<VecDeque<ExecResult>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    /// Queue `results` in order.
    pub fn with_results(results: Vec<ExecResult>) -> Self {
        Self {
            responses: Mutex::new(results.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every command line issued so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn next(&self, program: &str, args: &[&str]) -> ExecResult {
        self.calls
            .lock()
            .expect("calls lock")
            .push(render_command(program, args));
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| result(true, ""))
    }
}

impl Executor for ScriptedExecutor {
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        let r = self.next(program, args);
        if r.success {
            Ok(r)
        } else {
            anyhow::bail!("{program} failed: {}", r.stderr)
        }
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        Ok(self.next(program, args))
    }

    fn which(&self, _program: &str) -> bool {
        false
    }
}

/// Build an [`ExecResult`].
pub fn result(success: bool, stderr: &str) -> ExecResult {
    ExecResult {
        stdout: String::new(),
        stderr: stderr.to_string(),
        success,
        code: Some(i32::from(!success)),
    }
}

/// Service controller recording restarts; `failing` targets fail.
#[derive(Debug, Default)]
pub struct RecordingServices {
    restarted: Mutex<Vec<RestartTarget>>,
    failing: Vec<RestartTarget>,
}

impl RecordingServices {
    /// A controller whose restarts of `targets` fail.
    pub fn failing(targets: Vec<RestartTarget>) -> Self {
        Self {
            restarted: Mutex::new(Vec::new()),
            failing: targets,
        }
    }

    /// Targets restarted so far, in order.
    pub fn restarted(&self) -> Vec<RestartTarget> {
        self.restarted.lock().expect("restarted lock").clone()
    }
}

impl ServiceControl for RecordingServices {
    fn restart(&self, target: &RestartTarget) -> Result<RestartStatus, PrefError> {
        self.restarted
            .lock()
            .expect("restarted lock")
            .push(target.clone());
        if self.failing.contains(target) {
            return Err(PrefError::RestartFailed {
                service: target.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(RestartStatus::Restarted)
    }
}

/// [`Log`] that keeps summary entries and drops messages.
#[derive(Debug, Default)]
pub struct QuietLog {
    entries: Mutex<Vec<(String, EntryStatus)>>,
}

impl QuietLog {
    /// Recorded `(name, status)` pairs.
    pub fn entries(&self) -> Vec<(String, EntryStatus)> {
        self.entries.lock().expect("entries lock").clone()
    }
}

impl Log for QuietLog {
    fn stage(&self, _msg: &str) {}
    fn info(&self, _msg: &str) {}
    fn debug(&self, _msg: &str) {}
    fn warn(&self, _msg: &str) {}
    fn error(&self, _msg: &str) {}
    fn dry_run(&self, _msg: &str) {}
    fn record(&self, name: &str, status: EntryStatus, _message: Option<&str>) {
        self.entries
            .lock()
            .expect("entries lock")
            .push((name.to_string(), status));
    }
}
