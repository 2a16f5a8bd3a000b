//! User-defined plans loaded from a TOML plan file.
//!
//! Each top-level table is one plan:
//!
//! ```toml
//! [finder-tweaks]
//! description = "Show the Finder path bar"
//! aliases = ["finder"]
//!
//! [[finder-tweaks.directives]]
//! domain = "com.apple.finder"
//! key = "ShowPathbar"
//! value = true
//! restart = ["Finder"]
//! ```
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::toml_loader;
use crate::directive::{Directive, PrefValue, RestartTarget, Scope};
use crate::error::ConfigError;
use crate::plan::ApplicationPlan;

/// One plan table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanSection {
    /// One-line description.
    #[serde(default)]
    pub description: String,
    /// Alternative names.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Explicit restart order, by process name.
    #[serde(default)]
    pub restart_order: Vec<String>,
    /// Directive declarations, in application order.
    #[serde(default)]
    pub directives: Vec<DirectiveEntry>,
}

/// One `[[plan.directives]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectiveEntry {
    /// Preference domain.
    pub domain: String,
    /// Key within the domain.
    pub key: String,
    /// Value to write; absent for deletes.
    pub value: Option<toml::Value>,
    /// `user`, `host` or `system`.
    pub scope: Option<String>,
    /// `write` or `delete`; inferred from `value` when omitted.
    pub action: Option<String>,
    /// Whether a failure fails the run.
    #[serde(default = "default_required")]
    pub required: bool,
    /// Services to restart, by process name.
    #[serde(default)]
    pub restart: Vec<String>,
}

const fn default_required() -> bool {
    true
}

/// Load every plan from `path`. A missing file yields no plans.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or if a
/// directive is malformed.
pub fn load(path: &Path) -> Result<Vec<ApplicationPlan>, ConfigError> {
    let sections: BTreeMap<String, PlanSection> = toml_loader::load_config(path)?;
    sections
        .into_iter()
        .map(|(name, section)| into_plan(&name, section))
        .collect()
}

/// Build an [`ApplicationPlan`] from a parsed section.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidDirective`] for the first malformed directive.
pub fn into_plan(name: &str, section: PlanSection) -> Result<ApplicationPlan, ConfigError> {
    let mut builder = ApplicationPlan::builder(name)
        .description(&section.description)
        .restart_order(section.restart_order.iter().map(|s| RestartTarget::from(s.as_str())));
    for alias in &section.aliases {
        builder = builder.alias(alias);
    }
    for (index, entry) in section.directives.into_iter().enumerate() {
        builder = builder.directive(into_directive(name, index, entry)?);
    }
    Ok(builder.build())
}

fn into_directive(plan: &str, index: usize, entry: DirectiveEntry) -> Result<Directive, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidDirective {
        plan: plan.to_string(),
        index,
        key: entry.key.clone(),
        reason: reason.to_string(),
    };

    if entry.domain.trim().is_empty() {
        return Err(invalid("domain must not be empty"));
    }
    if entry.key.trim().is_empty() {
        return Err(invalid("key must not be empty"));
    }

    let action = entry
        .action
        .as_deref()
        .unwrap_or(if entry.value.is_some() { "write" } else { "delete" });
    let mut directive = match (action, &entry.value) {
        ("write", Some(value)) => {
            let value = pref_value(value).map_err(|reason| invalid(&reason))?;
            Directive::write(&entry.domain, &entry.key, value)
        }
        ("write", None) => return Err(invalid("write directives need a value")),
        ("delete", None) => Directive::delete(&entry.domain, &entry.key),
        ("delete", Some(_)) => return Err(invalid("delete directives cannot carry a value")),
        (other, _) => {
            return Err(invalid(&format!(
                "unknown action '{other}': expected write or delete"
            )));
        }
    };

    if let Some(scope) = &entry.scope {
        let scope: Scope = scope.parse().map_err(|reason: String| invalid(&reason))?;
        directive = directive.in_scope(scope);
    }
    if !entry.required {
        directive = directive.best_effort();
    }
    for name in &entry.restart {
        directive = directive.restarting(RestartTarget::from(name.as_str()));
    }
    Ok(directive)
}

/// Convert a TOML scalar to a [`PrefValue`].
fn pref_value(value: &toml::Value) -> Result<PrefValue, String> {
    match value {
        toml::Value::Boolean(b) => Ok(PrefValue::Boolean(*b)),
        toml::Value::Integer(i) => Ok(PrefValue::Integer(*i)),
        toml::Value::Float(f) => Ok(PrefValue::Float(*f)),
        toml::Value::String(s) => Ok(PrefValue::String(s.clone())),
        other => Err(format!(
            "unsupported value type {}: expected bool, integer, float or string",
            other.type_str()
        )),
    }
}
