use std::fmt;
use std::path::Path;

use super::{Elevation, PreferenceStore, StoreChange};
use crate::directive::{Action, Directive, PrefValue, Scope};
use crate::error::PrefError;
use crate::exec::{Executor, render_command};

/// Directory holding system-wide preference plists.
const SYSTEM_PREFERENCES_DIR: &str = "/Library/Preferences";

/// stderr fragments meaning the key (or the whole domain) is absent.
const ABSENT_MARKERS: &[&str] = &["does not exist", "not found"];
/// stderr fragments meaning privilege was missing or refused.
const DENIED_MARKERS: &[&str] = &[
    "Permission denied",
    "Operation not permitted",
    "a password is required",
    "not allowed",
];
/// stderr fragments meaning `defaults` rejected the key or value.
const REJECTED_MARKERS: &[&str] = &["Could not parse", "Unexpected argument", "is not a"];

/// Plist path used for a system-scope domain.
///
/// Absolute paths are used as given; anything else lands in
/// `/Library/Preferences`.
#[must_use]
pub fn system_plist_path(domain: &str) -> String {
    if Path::new(domain).is_absolute() {
        domain.to_string()
    } else {
        format!("{SYSTEM_PREFERENCES_DIR}/{domain}")
    }
}

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to run.
    pub program: String,
    /// Its arguments.
    pub args: Vec<String>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        f.write_str(&render_command(&self.program, &args))
    }
}

/// [`PreferenceStore`] backed by the `defaults` command.
#[derive(Debug)]
pub struct DefaultsStore<'a> {
    executor: &'a dyn Executor,
    elevation: Elevation,
}

impl<'a> DefaultsStore<'a> {
    /// Create a store issuing commands through `executor`.
    ///
    /// `elevation` decides whether system-scope commands are wrapped in
    /// `sudo -n`, and under root, which user the other scopes run as.
    #[must_use]
    pub fn new(executor: &'a dyn Executor, elevation: Elevation) -> Self {
        Self {
            executor,
            elevation,
        }
    }

    /// The command line that applies `directive`.
    #[must_use]
    pub fn invocation(&self, directive: &Directive) -> Invocation {
        match &directive.action {
            Action::Write(value) => self.build(directive, Some(value)),
            Action::Delete => self.build(directive, None),
        }
    }

    fn build(&self, directive: &Directive, value: Option<&PrefValue>) -> Invocation {
        let mut args: Vec<String> = Vec::new();
        if directive.scope == Scope::CurrentHost {
            args.push("-currentHost".to_string());
        }
        args.push(if value.is_some() { "write" } else { "delete" }.to_string());
        args.push(match directive.scope {
            Scope::System => system_plist_path(&directive.domain),
            Scope::CurrentUser | Scope::CurrentHost => directive.domain.clone(),
        });
        args.push(directive.key.clone());
        if let Some(value) = value {
            args.push(value.type_flag().to_string());
            args.push(value.to_string());
        }

        let sudo: Option<Vec<String>> = match (&self.elevation, directive.scope) {
            (Elevation::Sudo, Scope::System) => Some(vec!["-n".to_string()]),
            (
                Elevation::Root {
                    invoking_user: Some(user),
                },
                Scope::CurrentUser | Scope::CurrentHost,
            ) => Some(vec!["-u".to_string(), user.clone()]),
            _ => None,
        };

        match sudo {
            Some(mut sudo_args) => {
                sudo_args.push("defaults".to_string());
                sudo_args.extend(args);
                Invocation {
                    program: "sudo".to_string(),
                    args: sudo_args,
                }
            }
            None => Invocation {
                program: "defaults".to_string(),
                args,
            },
        }
    }

    fn execute(&self, directive: &Directive, invocation: &Invocation) -> Result<StoreChange, PrefError> {
        let deleting = directive.action == Action::Delete;
        let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();
        let result = self
            .executor
            .run_unchecked(&invocation.program, &args)
            .map_err(|e| PrefError::StoreUnavailable {
                target: directive.target(),
                reason: format!("{e:#}"),
            })?;

        if result.success {
            return Ok(if deleting {
                StoreChange::Deleted
            } else {
                StoreChange::Written
            });
        }
        classify_failure(&directive.target(), result.stderr.trim(), deleting)
    }
}

/// Map a failed `defaults` run to an outcome by its stderr.
fn classify_failure(target: &str, stderr: &str, deleting: bool) -> Result<StoreChange, PrefError> {
    let has = |markers: &[&str]| markers.iter().any(|m| stderr.contains(m));
    let reason = stderr.to_string();
    let target = target.to_string();

    if deleting && has(ABSENT_MARKERS) {
        Ok(StoreChange::AlreadyAbsent)
    } else if has(DENIED_MARKERS) {
        Err(PrefError::PermissionDenied { target, reason })
    } else if has(REJECTED_MARKERS) {
        Err(PrefError::KeyRejected { target, reason })
    } else {
        Err(PrefError::StoreUnavailable { target, reason })
    }
}

impl PreferenceStore for DefaultsStore<'_> {
    fn write(&self, directive: &Directive, value: &PrefValue) -> Result<StoreChange, PrefError> {
        let invocation = self.build(directive, Some(value));
        self.execute(directive, &invocation)
    }

    fn delete(&self, directive: &Directive) -> Result<StoreChange, PrefError> {
        let invocation = self.build(directive, None);
        self.execute(directive, &invocation)
    }
}
