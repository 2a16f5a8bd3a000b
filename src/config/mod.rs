//! User plan file configuration.
pub mod plans;
pub mod toml_loader;
pub mod validation;

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::plan::{Catalog, builtin_plans};
use validation::ValidationWarning;

/// Environment variable overriding the plan file location.
pub const PLANS_ENV: &str = "MACPREFS_PLANS";

/// Resolve the plan file path.
///
/// Order: the explicit `--plans` value, `$MACPREFS_PLANS`, then
/// `$XDG_CONFIG_HOME/macprefs/plans.toml` (default
/// `~/.config/macprefs/plans.toml`).
#[must_use]
pub fn plans_file_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(PLANS_ENV)
        && !path.is_empty()
    {
        return PathBuf::from(path);
    }
    let config_home = std::env::var("XDG_CONFIG_HOME").map_or_else(
        |_| {
            std::env::var("HOME")
                .map_or_else(|_| PathBuf::from("."), PathBuf::from)
                .join(".config")
        },
        PathBuf::from,
    );
    config_home.join("macprefs").join("plans.toml")
}

/// The plan catalog plus anything worth warning about.
#[derive(Debug)]
pub struct Config {
    /// Built-in and user plans.
    pub catalog: Catalog,
    /// Validation warnings for the user plans.
    pub warnings: Vec<ValidationWarning>,
}

impl Config {
    /// Load user plans from `path` and merge them with the built-ins.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the plan file exists but is unreadable
    /// or malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let user = plans::load(path)?;
        let warnings = validation::validate_user_plans(&user, &builtin_plans());
        Ok(Self {
            catalog: Catalog::with_user_plans(user),
            warnings,
        })
    }
}
