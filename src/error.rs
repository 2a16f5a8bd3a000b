//! Domain-specific error types for the preference engine.
//!
//! Library code returns typed errors ([`PrefError`], [`ConfigError`]); command
//! handlers at the CLI boundary convert them to [`anyhow::Error`] via `?`.
//!
//! # Error hierarchy
//!
//! ```text
//! PrefError                 : recorded per directive / per restart
//! ├── PermissionDenied      : elevation missing or refused
//! ├── KeyRejected           : store refused the value (malformed directive)
//! ├── StoreUnavailable      : backing store missing, corrupt or unreachable
//! └── RestartFailed         : a service could not be restarted
//!
//! ConfigError               : plan file loading and directive declarations
//! ```

use thiserror::Error;

/// Failure of a single store operation or service restart.
///
/// These never abort a run: the applier records them against the directive
/// (or restart) that produced them and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrefError {
    /// The operation needs privilege the current process does not hold.
    ///
    /// Typically recoverable by re-running the same plan with `sudo`.
    #[error("permission denied for {target}: {reason}")]
    PermissionDenied {
        /// `domain key` the operation addressed.
        target: String,
        /// Why the privilege check failed.
        reason: String,
    },

    /// The store rejected the key or value; the directive itself is malformed.
    #[error("{target} rejected by store: {reason}")]
    KeyRejected {
        /// `domain key` the operation addressed.
        target: String,
        /// Message reported by the store.
        reason: String,
    },

    /// The store backing the domain could not be reached or written.
    #[error("store unavailable for {target}: {reason}")]
    StoreUnavailable {
        /// `domain key` the operation addressed.
        target: String,
        /// Message reported by the store or the executor.
        reason: String,
    },

    /// A service could not be restarted after its directives were applied.
    #[error("failed to restart {service}: {reason}")]
    RestartFailed {
        /// Name of the service.
        service: String,
        /// Message reported by the service controller.
        reason: String,
    },
}

impl PrefError {
    /// Short machine-friendly name of the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PermissionDenied { .. } => "permission-denied",
            Self::KeyRejected { .. } => "key-rejected",
            Self::StoreUnavailable { .. } => "store-unavailable",
            Self::RestartFailed { .. } => "restart-failed",
        }
    }
}

/// Errors that arise while loading user-defined plans.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading a plan file.
    #[error("IO error reading plan file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The plan file is not valid TOML or does not match the plan schema.
    #[error("invalid plan file {path}: {message}")]
    InvalidSyntax {
        /// Path to the offending file.
        path: String,
        /// Parser message.
        message: String,
    },

    /// A directive declaration is inconsistent.
    #[error("plan '{plan}', directive {index} ({key}): {reason}")]
    InvalidDirective {
        /// Plan that contains the directive.
        plan: String,
        /// Zero-based position of the directive inside the plan.
        index: usize,
        /// Key the directive addresses.
        key: String,
        /// What is wrong with it.
        reason: String,
    },
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn permission_denied_display() {
        let e = PrefError::PermissionDenied {
            target: "com.apple.SubmitDiagInfo AutoSubmit".to_string(),
            reason: "elevation unavailable".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "permission denied for com.apple.SubmitDiagInfo AutoSubmit: elevation unavailable"
        );
    }

    #[test]
    fn key_rejected_display() {
        let e = PrefError::KeyRejected {
            target: "com.apple.dock tilesize".to_string(),
            reason: "Could not parse: abc".to_string(),
        };
        assert!(e.to_string().contains("rejected by store"));
        assert!(e.to_string().contains("Could not parse"));
    }

    #[test]
    fn restart_failed_display() {
        let e = PrefError::RestartFailed {
            service: "Dock".to_string(),
            reason: "killall exited 2".to_string(),
        };
        assert_eq!(e.to_string(), "failed to restart Dock: killall exited 2");
    }

    #[test]
    fn kinds_are_distinct() {
        let denied = PrefError::PermissionDenied {
            target: String::new(),
            reason: String::new(),
        };
        let rejected = PrefError::KeyRejected {
            target: String::new(),
            reason: String::new(),
        };
        assert_ne!(denied.kind(), rejected.kind());
        assert_eq!(denied.kind(), "permission-denied");
    }

    #[test]
    fn config_error_io_has_source() {
        use std::error::Error as StdError;
        let e = ConfigError::Io {
            path: "/tmp/plans.toml".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/tmp/plans.toml"));
    }

    #[test]
    fn config_error_invalid_directive_display() {
        let e = ConfigError::InvalidDirective {
            plan: "finder".to_string(),
            index: 2,
            key: "ShowPathbar".to_string(),
            reason: "delete directives cannot carry a value".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "plan 'finder', directive 2 (ShowPathbar): delete directives cannot carry a value"
        );
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<PrefError>();
        assert_send_sync::<ConfigError>();
    }

    #[test]
    fn pref_error_converts_to_anyhow() {
        let e = PrefError::StoreUnavailable {
            target: "x y".to_string(),
            reason: "gone".to_string(),
        };
        let _anyhow_err: anyhow::Error = e.into();
    }
}
