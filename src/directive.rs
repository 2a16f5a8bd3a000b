//! Declarative preference mutations.
//!
//! A [`Directive`] names one key in one preference domain, says whether to
//! write or delete it, which store tier ([`Scope`]) it lives in, and which
//! services ([`RestartTarget`]) must be restarted for the change to show.

use std::fmt;
use std::str::FromStr;

/// Value written to a preference key.
///
/// The tag decides which `defaults` type flag is used; it is not checked
/// against the type the key expects.
#[derive(Debug, Clone, PartialEq)]
pub enum PrefValue {
    /// `-bool`
    Boolean(bool),
    /// `-int`
    Integer(i64),
    /// `-float`
    Float(f64),
    /// `-string`
    String(String),
}

impl PrefValue {
    /// The `defaults write` type flag for this value.
    #[must_use]
    pub const fn type_flag(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "-bool",
            Self::Integer(_) => "-int",
            Self::Float(_) => "-float",
            Self::String(_) => "-string",
        }
    }

    /// Name of the value type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }
}

impl fmt::Display for PrefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for PrefValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for PrefValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for PrefValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PrefValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Which preference store tier a directive targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// The invoking user's preferences.
    #[default]
    CurrentUser,
    /// The host-specific overlay (`-currentHost`).
    CurrentHost,
    /// System-wide preferences; needs elevated privilege.
    System,
}

impl Scope {
    /// Whether directives in this scope must run with elevated privilege.
    #[must_use]
    pub const fn requires_elevation(self) -> bool {
        matches!(self, Self::System)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CurrentUser => write!(f, "user"),
            Self::CurrentHost => write!(f, "host"),
            Self::System => write!(f, "system"),
        }
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" | "current-user" | "currentuser" => Ok(Self::CurrentUser),
            "host" | "current-host" | "currenthost" => Ok(Self::CurrentHost),
            "system" => Ok(Self::System),
            other => Err(format!(
                "unknown scope '{other}': expected user, host or system"
            )),
        }
    }
}

/// What a directive does to its key.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Store the value under the key.
    Write(PrefValue),
    /// Remove the key. Removing an absent key is not an error.
    Delete,
}

/// Whether a directive's failure fails the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Requirement {
    /// A failure makes the run unsuccessful.
    #[default]
    Required,
    /// A failure is reported but does not affect overall success.
    BestEffort,
}

/// A service that must be restarted for preference changes to show.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RestartTarget {
    /// `Dock`
    Dock,
    /// `SystemUIServer` (menu bar extras)
    SystemUiServer,
    /// `Finder`
    Finder,
    /// `ControlCenter`
    ControlCenter,
    /// `cfprefsd`, the preferences cache daemon
    Cfprefsd,
    /// Any other application, addressed by process name.
    App(String),
}

impl RestartTarget {
    /// Process name passed to `killall`.
    #[must_use]
    pub fn process_name(&self) -> &str {
        match self {
            Self::Dock => "Dock",
            Self::SystemUiServer => "SystemUIServer",
            Self::Finder => "Finder",
            Self::ControlCenter => "ControlCenter",
            Self::Cfprefsd => "cfprefsd",
            Self::App(name) => name,
        }
    }

    /// Whether the OS relaunches the service by itself after termination.
    #[must_use]
    pub const fn relaunches_itself(&self) -> bool {
        !matches!(self, Self::App(_))
    }
}

impl fmt::Display for RestartTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.process_name())
    }
}

impl From<&str> for RestartTarget {
    fn from(name: &str) -> Self {
        match name {
            "Dock" => Self::Dock,
            "SystemUIServer" => Self::SystemUiServer,
            "Finder" => Self::Finder,
            "ControlCenter" => Self::ControlCenter,
            "cfprefsd" => Self::Cfprefsd,
            other => Self::App(other.to_string()),
        }
    }
}

/// One atomic preference mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// Preference domain (bundle identifier, `NSGlobalDomain`, or a plist path).
    pub domain: String,
    /// Key within the domain.
    pub key: String,
    /// Write or delete.
    pub action: Action,
    /// Store tier.
    pub scope: Scope,
    /// Failure class.
    pub requirement: Requirement,
    /// Services to restart once this directive has been applied.
    pub restarts: Vec<RestartTarget>,
}

impl Directive {
    /// A required, current-user write with no restarts.
    #[must_use]
    pub fn write(domain: &str, key: &str, value: impl Into<PrefValue>) -> Self {
        Self {
            domain: domain.to_string(),
            key: key.to_string(),
            action: Action::Write(value.into()),
            scope: Scope::CurrentUser,
            requirement: Requirement::Required,
            restarts: Vec::new(),
        }
    }

    /// A required, current-user delete with no restarts.
    #[must_use]
    pub fn delete(domain: &str, key: &str) -> Self {
        Self {
            domain: domain.to_string(),
            key: key.to_string(),
            action: Action::Delete,
            scope: Scope::CurrentUser,
            requirement: Requirement::Required,
            restarts: Vec::new(),
        }
    }

    /// Target the given store tier.
    #[must_use]
    pub const fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Mark the directive best-effort.
    #[must_use]
    pub const fn best_effort(mut self) -> Self {
        self.requirement = Requirement::BestEffort;
        self
    }

    /// Add a service to restart after this directive.
    #[must_use]
    pub fn restarting(mut self, target: RestartTarget) -> Self {
        if !self.restarts.contains(&target) {
            self.restarts.push(target);
        }
        self
    }

    /// `domain key`, used to address the directive in errors and logs.
    #[must_use]
    pub fn target(&self) -> String {
        format!("{} {}", self.domain, self.key)
    }

    /// Whether a failure of this directive fails the run.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.requirement == Requirement::Required
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host = match self.scope {
            Scope::CurrentUser => "",
            Scope::CurrentHost => " [host]",
            Scope::System => " [system]",
        };
        match &self.action {
            Action::Write(value) => write!(
                f,
                "write {} {} = {value} ({}){host}",
                self.domain,
                self.key,
                value.type_name()
            ),
            Action::Delete => write!(f, "delete {} {}{host}", self.domain, self.key),
        }
    }
}
