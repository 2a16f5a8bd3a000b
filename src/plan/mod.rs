//! Named, ordered collections of directives.
//!
//! An [`ApplicationPlan`] is the unit the CLI selects by name.  Besides its
//! directives it owns a fixed restart order, so that a service another
//! pending restart depends on is never brought down out of turn.

pub mod catalog;

pub use catalog::{Catalog, builtin_plans};

use crate::directive::{Directive, RestartTarget};

/// Ordered directives plus the restart order derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationPlan {
    name: String,
    aliases: Vec<String>,
    description: String,
    directives: Vec<Directive>,
    restart_order: Vec<RestartTarget>,
}

impl ApplicationPlan {
    /// Start building a plan called `name`.
    #[must_use]
    pub fn builder(name: &str) -> PlanBuilder {
        PlanBuilder {
            name: name.to_string(),
            aliases: Vec::new(),
            description: String::new(),
            directives: Vec::new(),
            restart_order: Vec::new(),
        }
    }

    /// Canonical plan name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alternative names the plan answers to.
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// One-line description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Directives in application order.
    #[must_use]
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Every restart target referenced by the plan, in the order restarts run.
    #[must_use]
    pub fn restart_order(&self) -> &[RestartTarget] {
        &self.restart_order
    }

    /// The targets `directives` reference, in restart order.
    ///
    /// Declared targets no directive references are never restarted.
    #[must_use]
    pub fn restarts_for<'d>(
        &self,
        directives: impl IntoIterator<Item = &'d Directive>,
    ) -> Vec<&RestartTarget> {
        let touched: Vec<&RestartTarget> = directives
            .into_iter()
            .flat_map(|d| d.restarts.iter())
            .collect();
        self.restart_order
            .iter()
            .filter(|target| touched.iter().any(|t| t == target))
            .collect()
    }

    /// Whether `name` is this plan's name or one of its aliases.
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }
}

/// Builder for [`ApplicationPlan`].
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    name: String,
    aliases: Vec<String>,
    description: String,
    directives: Vec<Directive>,
    restart_order: Vec<RestartTarget>,
}

impl PlanBuilder {
    /// Add an alternative name.
    #[must_use]
    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Append a directive.
    #[must_use]
    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    /// Append several directives.
    #[must_use]
    pub fn directives(mut self, directives: impl IntoIterator<Item = Directive>) -> Self {
        self.directives.extend(directives);
        self
    }

    /// Declare the order in which restarts must run.
    ///
    /// Targets referenced by directives but missing here are restarted
    /// afterwards, in order of first appearance.
    #[must_use]
    pub fn restart_order(mut self, order: impl IntoIterator<Item = RestartTarget>) -> Self {
        self.restart_order = order.into_iter().collect();
        self
    }

    /// Finish the plan, completing and de-duplicating the restart order.
    #[must_use]
    pub fn build(self) -> ApplicationPlan {
        let mut order: Vec<RestartTarget> = Vec::new();
        let referenced = self.directives.iter().flat_map(|d| d.restarts.iter());
        for target in self.restart_order.iter().chain(referenced) {
            if !order.contains(target) {
                order.push(target.clone());
            }
        }

        ApplicationPlan {
            name: self.name,
            aliases: self.aliases,
            description: self.description,
            directives: self.directives,
            restart_order: order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_order_follows_first_appearance() {
        let plan = ApplicationPlan::builder("p")
            .directive(
                Directive::write("a", "k1", true).restarting(RestartTarget::SystemUiServer),
            )
            .directive(Directive::write("b", "k2", true).restarting(RestartTarget::Dock))
            .directive(
                Directive::write("c", "k3", true).restarting(RestartTarget::SystemUiServer),
            )
            .build();
        assert_eq!(
            plan.restart_order(),
            &[RestartTarget::SystemUiServer, RestartTarget::Dock]
        );
    }

    #[test]
    fn declared_order_wins_and_is_completed() {
        let plan = ApplicationPlan::builder("p")
            .restart_order([RestartTarget::Cfprefsd, RestartTarget::Cfprefsd])
            .directive(Directive::write("a", "k", true).restarting(RestartTarget::Dock))
            .directive(Directive::write("b", "k", true).restarting(RestartTarget::Cfprefsd))
            .build();
        assert_eq!(
            plan.restart_order(),
            &[RestartTarget::Cfprefsd, RestartTarget::Dock]
        );
    }

    #[test]
    fn restarts_for_skips_unreferenced_declared_targets() {
        let plan = ApplicationPlan::builder("p")
            .restart_order([RestartTarget::Cfprefsd])
            .directive(Directive::write("a", "k", true).restarting(RestartTarget::Finder))
            .directive(Directive::write("b", "k", true).restarting(RestartTarget::Dock))
            .build();
        assert_eq!(
            plan.restarts_for(plan.directives()),
            vec![&RestartTarget::Finder, &RestartTarget::Dock]
        );
        assert_eq!(
            plan.restarts_for(plan.directives().iter().skip(1)),
            vec![&RestartTarget::Dock]
        );
    }

    #[test]
    fn answers_to_name_and_aliases() {
        let plan = ApplicationPlan::builder("hide-dock")
            .alias("minimize-dock")
            .build();
        assert!(plan.answers_to("hide-dock"));
        assert!(plan.answers_to("minimize-dock"));
        assert!(!plan.answers_to("show-dock"));
    }

    #[test]
    fn empty_plan_has_no_restarts() {
        let plan = ApplicationPlan::builder("empty").build();
        assert!(plan.directives().is_empty());
        assert!(plan.restart_order().is_empty());
    }
}
