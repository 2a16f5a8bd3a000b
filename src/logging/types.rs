//! Core logging types: summary entries, status, and the [`Log`] trait.

/// One line of the run summary.
#[derive(Debug, Clone)]
pub struct SummaryEntry {
    /// Directive or service the entry describes.
    pub name: String,
    /// Final status.
    pub status: EntryStatus,
    /// Optional detail message (skip reason, error description).
    pub message: Option<String>,
}

/// Status of a directive or restart in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Directive was applied to the store.
    Applied,
    /// Directive had nothing to do (e.g. deleting an absent key).
    Skipped,
    /// Directive or restart failed.
    Failed,
    /// Service was restarted, or was not running.
    Restarted,
    /// Nothing was changed because of `--dry-run`.
    DryRun,
}

impl EntryStatus {
    /// Lowercase name written to the log file.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Restarted => "restarted",
            Self::DryRun => "dry-run",
        }
    }

    /// Summary icon and ANSI colour for this status.
    #[must_use]
    pub const fn icon(self) -> (&'static str, &'static str) {
        match self {
            Self::Applied => ("✓", "\x1b[32m"),
            Self::Skipped => ("○", "\x1b[33m"),
            Self::Failed => ("✗", "\x1b[31m"),
            Self::Restarted => ("↻", "\x1b[36m"),
            Self::DryRun => ("~", "\x1b[37m"),
        }
    }
}

/// Abstraction over logging backends.
///
/// The applier logs through this trait so it can be driven by the real
/// [`Logger`](super::logger::Logger) or by a test double.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a summary entry.
    fn record(&self, name: &str, status: EntryStatus, message: Option<&str>);
}
