//! Service restarts.
//!
//! Preference changes for system UI processes only become visible once the
//! process re-reads its preferences, which in practice means killing it.

use crate::directive::RestartTarget;
use crate::error::PrefError;
use crate::exec::Executor;

/// stderr `killall` prints when nothing matched.
const NOT_RUNNING_MARKER: &str = "No matching processes";

/// Result of a successful restart request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartStatus {
    /// The service was terminated (and relaunched where needed).
    Restarted,
    /// The service was not running; nothing to restart.
    NotRunning,
}

/// Restarts services so they pick up preference changes.
#[cfg_attr(test, mockall::automock)]
pub trait ServiceControl: Send + Sync {
    /// Restart `target`.
    ///
    /// # Errors
    ///
    /// Returns [`PrefError::RestartFailed`] if the service could not be
    /// terminated or relaunched.
    fn restart(&self, target: &RestartTarget) -> Result<RestartStatus, PrefError>;
}

/// [`ServiceControl`] using `killall` and `open -a`.
#[derive(Debug)]
pub struct KillallServices<'a> {
    executor: &'a dyn Executor,
}

impl<'a> KillallServices<'a> {
    /// Create a controller issuing commands through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn Executor) -> Self {
        Self { executor }
    }

    fn failed(target: &RestartTarget, reason: String) -> PrefError {
        PrefError::RestartFailed {
            service: target.to_string(),
            reason,
        }
    }
}

impl ServiceControl for KillallServices<'_> {
    fn restart(&self, target: &RestartTarget) -> Result<RestartStatus, PrefError> {
        let process = target.process_name();
        let result = self
            .executor
            .run_unchecked("killall", &[process])
            .map_err(|e| Self::failed(target, format!("{e:#}")))?;

        if !result.success {
            if result.stderr.contains(NOT_RUNNING_MARKER) {
                return Ok(RestartStatus::NotRunning);
            }
            return Err(Self::failed(
                target,
                format!(
                    "killall exited {}: {}",
                    result.code.unwrap_or(-1),
                    result.stderr.trim()
                ),
            ));
        }

        if !target.relaunches_itself() {
            self.executor
                .run("open", &["-a", process])
                .map_err(|e| Self::failed(target, format!("relaunch failed: {e:#}")))?;
        }
        Ok(RestartStatus::Restarted)
    }
}
