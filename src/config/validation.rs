//! Lint checks over user-defined plans.
use std::collections::HashSet;

use crate::directive::Scope;
use crate::plan::ApplicationPlan;

/// A validation warning detected while loading user plans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The plan that triggered the warning.
    pub plan: String,
    /// The specific name or directive at fault.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a warning.
    #[must_use]
    pub fn new(
        plan: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            plan: plan.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

/// Trait for plan validators.
pub trait ConfigValidator {
    /// Validate and return any warnings found.
    fn validate(&self) -> Vec<ValidationWarning>;

    /// Human-readable name of the validator.
    fn name(&self) -> &'static str;
}

/// Warns about user plans whose name or alias is already taken by a
/// built-in plan. The built-in always wins the lookup.
#[derive(Debug)]
pub struct ShadowingValidator<'a> {
    user: &'a [ApplicationPlan],
    builtins: &'a [ApplicationPlan],
}

impl<'a> ShadowingValidator<'a> {
    /// Check `user` plans against `builtins`.
    #[must_use]
    pub const fn new(user: &'a [ApplicationPlan], builtins: &'a [ApplicationPlan]) -> Self {
        Self { user, builtins }
    }
}

impl ConfigValidator for ShadowingValidator<'_> {
    fn validate(&self) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        for plan in self.user {
            let names = std::iter::once(plan.name()).chain(plan.aliases().iter().map(String::as_str));
            for name in names {
                if let Some(builtin) = self.builtins.iter().find(|b| b.answers_to(name)) {
                    warnings.push(ValidationWarning::new(
                        plan.name(),
                        name,
                        format!("shadowed by built-in plan '{}' and will be ignored", builtin.name()),
                    ));
                }
            }
        }
        warnings
    }

    fn name(&self) -> &'static str {
        "shadowing"
    }
}

/// Warns about empty plans and repeated `(domain, key, scope)` targets.
#[derive(Debug)]
pub struct DirectiveValidator<'a> {
    plans: &'a [ApplicationPlan],
}

impl<'a> DirectiveValidator<'a> {
    /// Check every plan in `plans`.
    #[must_use]
    pub const fn new(plans: &'a [ApplicationPlan]) -> Self {
        Self { plans }
    }
}

impl ConfigValidator for DirectiveValidator<'_> {
    fn validate(&self) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        for plan in self.plans {
            if plan.directives().is_empty() {
                warnings.push(ValidationWarning::new(
                    plan.name(),
                    plan.name(),
                    "plan has no directives",
                ));
                continue;
            }

            let mut seen: HashSet<(&str, &str, Scope)> = HashSet::new();
            for directive in plan.directives() {
                let slot = (directive.domain.as_str(), directive.key.as_str(), directive.scope);
                if !seen.insert(slot) {
                    warnings.push(ValidationWarning::new(
                        plan.name(),
                        directive.target(),
                        format!(
                            "key is set more than once in {} scope; the last directive wins",
                            directive.scope
                        ),
                    ));
                }
            }
        }
        warnings
    }

    fn name(&self) -> &'static str {
        "directives"
    }
}

/// Run every validator over the loaded user plans.
#[must_use]
pub fn validate_user_plans(
    user: &[ApplicationPlan],
    builtins: &[ApplicationPlan],
) -> Vec<ValidationWarning> {
    let validators: [&dyn ConfigValidator; 2] = [
        &ShadowingValidator::new(user, builtins),
        &DirectiveValidator::new(user),
    ];
    validators.iter().flat_map(|v| v.validate()).collect()
}
