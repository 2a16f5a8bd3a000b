//! TOML configuration file parsing.
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::ConfigError;

/// Load and deserialize a TOML file.
///
/// A missing file deserializes as empty TOML, so callers get their type's
/// empty value instead of an error.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file exists but cannot be read, and
/// [`ConfigError::InvalidSyntax`] if it does not match `T`.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return parse_config("", path);
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_config(&content, path)
}

/// Deserialize TOML `content`, attributing errors to `path`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidSyntax`] on any parse or schema error.
pub fn parse_config<T: DeserializeOwned>(content: &str, path: &Path) -> Result<T, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::InvalidSyntax {
        path: path.display().to_string(),
        message: e.message().to_string(),
    })
}
