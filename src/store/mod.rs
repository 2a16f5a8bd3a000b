//! Preference store abstraction.
//!
//! The applier never talks to `defaults` directly; it goes through a
//! [`PreferenceStore`], so the same plan can be applied to the real OS store
//! ([`DefaultsStore`]) or to an in-process map ([`MemoryStore`]).

mod defaults;
mod memory;

pub use defaults::{DefaultsStore, Invocation, system_plist_path};
pub use memory::MemoryStore;

use std::fmt;

use crate::directive::{Directive, PrefValue, Scope};
use crate::error::PrefError;
use crate::exec::Executor;

/// What a successful store operation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    /// The value was written.
    Written,
    /// The key was removed.
    Deleted,
    /// The key to delete did not exist.
    AlreadyAbsent,
}

/// A backing store for preference keys.
pub trait PreferenceStore: Send + Sync + fmt::Debug {
    /// Write `value` under the directive's domain and key.
    ///
    /// # Errors
    ///
    /// Returns a [`PrefError`] describing why the store refused the write.
    fn write(&self, directive: &Directive, value: &PrefValue) -> Result<StoreChange, PrefError>;

    /// Delete the directive's key. Deleting an absent key succeeds with
    /// [`StoreChange::AlreadyAbsent`].
    ///
    /// # Errors
    ///
    /// Returns a [`PrefError`] describing why the store refused the delete.
    fn delete(&self, directive: &Directive) -> Result<StoreChange, PrefError>;
}

/// The privilege the process runs with, as it affects each scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Elevation {
    /// The process already runs as root.
    ///
    /// User and host scope directives belong to `invoking_user`, the account
    /// that ran `sudo`, and are issued as that user. Without one they are
    /// refused, since they would land in root's own preferences.
    Root {
        /// The `SUDO_USER` the process was started by.
        invoking_user: Option<String>,
    },
    /// Non-interactive `sudo -n` works.
    Sudo,
    /// Neither; system-scope directives fail with permission denied.
    Unavailable,
}

impl Elevation {
    /// Root with an invoking user.
    #[must_use]
    pub fn root_for(user: &str) -> Self {
        Self::Root {
            invoking_user: Some(user.to_string()),
        }
    }

    /// Probe the host once: `id -u`, then `sudo -n true` when `probe_sudo`
    /// is set. The invoking user comes from `$SUDO_USER`.
    #[must_use]
    pub fn detect(executor: &dyn Executor, probe_sudo: bool) -> Self {
        Self::detect_as(executor, probe_sudo, std::env::var("SUDO_USER").ok())
    }

    fn detect_as(executor: &dyn Executor, probe_sudo: bool, sudo_user: Option<String>) -> Self {
        let is_root = executor
            .run_unchecked("id", &["-u"])
            .is_ok_and(|r| r.success && r.stdout.trim() == "0");
        if is_root {
            return Self::Root {
                invoking_user: sudo_user.filter(|u| !u.is_empty() && u != "root"),
            };
        }
        if probe_sudo
            && executor.which("sudo")
            && executor
                .run_unchecked("sudo", &["-n", "true"])
                .is_ok_and(|r| r.success)
        {
            return Self::Sudo;
        }
        Self::Unavailable
    }

    /// Whether system-scope directives can be attempted at all.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }

    /// Why a directive in `scope` must not reach the store, if it must not.
    #[must_use]
    pub const fn refusal(&self, scope: Scope) -> Option<&'static str> {
        match (self, scope) {
            (Self::Unavailable, Scope::System) => {
                Some("elevated privilege unavailable (run with sudo or allow sudo -n)")
            }
            (
                Self::Root {
                    invoking_user: None,
                },
                Scope::CurrentUser | Scope::CurrentHost,
            ) => Some("running as root without SUDO_USER would change root's preferences"),
            _ => None,
        }
    }
}

impl fmt::Display for Elevation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root {
                invoking_user: Some(user),
            } => write!(f, "root (on behalf of {user})"),
            Self::Root {
                invoking_user: None,
            } => write!(f, "root"),
            Self::Sudo => write!(f, "sudo"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}
