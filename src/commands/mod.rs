//! Top-level subcommand orchestration.
pub mod apply;
pub mod completions;
pub mod list;
pub mod version;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::{self, Config};
use crate::logging::Logger;

/// Shared state produced by the common command setup sequence.
#[derive(Debug)]
pub struct CommandSetup {
    /// Loaded plans and their warnings.
    pub config: Config,
}

impl CommandSetup {
    /// Resolve the plan file, load it and report validation warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan file exists but cannot be loaded.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let path = config::plans_file_path(global.plans.as_deref());
        log.debug(&format!("plan file: {}", path.display()));

        let config = Config::load(&path)
            .with_context(|| format!("loading plans from {}", path.display()))?;
        log.debug(&format!(
            "{} plans ({} user-defined)",
            config.catalog.plans().len(),
            config.catalog.user_plans().len()
        ));

        if !config.warnings.is_empty() {
            log.warn(&format!(
                "found {} plan file warning(s):",
                config.warnings.len()
            ));
            for warning in &config.warnings {
                log.warn(&format!(
                    "  {} [{}]: {}",
                    warning.plan, warning.item, warning.message
                ));
            }
        }

        Ok(Self { config })
    }
}
