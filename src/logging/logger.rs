//! Structured logger with dry-run awareness and summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, OUTCOME_TARGET, STAGE_TARGET};
use super::types::{EntryStatus, Log, SummaryEntry};
use super::utils::log_file_path;

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with dry-run awareness and summary collection.
///
/// Every message is also written to `$XDG_CACHE_HOME/macprefs/<command>.log`
/// (default `~/.cache/macprefs/<command>.log`) by the subscriber's file
/// layer, regardless of the verbose flag.
#[derive(Debug)]
pub struct Logger {
    entries: Mutex<Vec<SummaryEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// Only remembers the log file path for the summary; the file itself is
    /// created by [`init_subscriber`](super::subscriber::init_subscriber).
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Return the log file path, if available.
    #[cfg(test)]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded entries.
    #[must_use]
    pub fn entries(&self) -> Vec<SummaryEntry> {
        self.entries.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Record a summary entry.
    ///
    /// The entry is also emitted as an outcome event carrying `status` and
    /// `reason` fields, which the file layer writes with the enclosing plan.
    pub fn record(&self, name: &str, status: EntryStatus, message: Option<&str>) {
        tracing::debug!(
            target: OUTCOME_TARGET,
            status = status.label(),
            reason = message,
            "{name}"
        );
        if let Ok(mut guard) = self.entries.lock() {
            guard.push(SummaryEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Count the failed entries.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.entries.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|e| e.status == EntryStatus::Failed)
                .count()
        })
    }

    /// Print the summary of all recorded entries.
    #[allow(clippy::print_stdout)]
    pub fn print_summary(&self) {
        let entries = self.entries();
        if entries.is_empty() {
            return;
        }

        println!();
        self.stage("Summary");

        let mut applied = 0u32;
        let mut skipped = 0u32;
        let mut failed = 0u32;
        let mut restarted = 0u32;
        let mut dry_run = 0u32;

        for entry in &entries {
            match entry.status {
                EntryStatus::Applied => applied += 1,
                EntryStatus::Skipped => skipped += 1,
                EntryStatus::Failed => failed += 1,
                EntryStatus::Restarted => restarted += 1,
                EntryStatus::DryRun => dry_run += 1,
            }
            let (icon, color) = entry.status.icon();
            let suffix = entry
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", entry.name));
        }

        println!();
        self.info(&format!(
            "\x1b[32m{applied} applied\x1b[0m, \x1b[33m{skipped} skipped\x1b[0m, \x1b[31m{failed} failed\x1b[0m, \x1b[36m{restarted} restarted\x1b[0m, \x1b[37m{dry_run} dry-run\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record(&self, name: &str, status: EntryStatus, message: Option<&str>) {
        self.record(name, status, message);
    }
}
