//! Command: list the available plans.
use anyhow::Result;

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::logging::{Log, Logger};
use crate::plan::{ApplicationPlan, Catalog};

/// Run the `list` subcommand.
///
/// # Errors
///
/// Returns an error if the plan file cannot be loaded.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    print_catalog(&setup.config.catalog, log);
    Ok(())
}

/// Log every plan, built-ins first, then user plans.
pub fn print_catalog(catalog: &Catalog, log: &dyn Log) {
    log.stage("Built-in plans");
    for plan in catalog.builtins() {
        log.info(&describe(plan));
    }

    let user = catalog.user_plans();
    if !user.is_empty() {
        log.stage("User plans");
        for plan in user {
            log.info(&describe(plan));
        }
    }
}

/// One listing line: name, aliases, directive count and description.
fn describe(plan: &ApplicationPlan) -> String {
    let aliases = if plan.aliases().is_empty() {
        String::new()
    } else {
        format!(" ({})", plan.aliases().join(", "))
    };
    format!(
        "{:<24} {:>2} directive(s)  {}",
        format!("{}{aliases}", plan.name()),
        plan.directives().len(),
        plan.description()
    )
}
