//! Built-in plans and plan lookup.

use crate::directive::{Directive, RestartTarget, Scope};

use super::ApplicationPlan;

const DOCK: &str = "com.apple.dock";
const DIAGNOSTICS_HISTORY: &str =
    "/Library/Application Support/CrashReporter/DiagnosticMessagesHistory.plist";

/// Keys `hide-dock` writes and `show-dock` removes.
pub const DOCK_MINIMIZE_KEYS: [&str; 4] = ["autohide", "autohide-delay", "tilesize", "static-only"];

/// Orientation `show-dock` pins explicitly.
pub const DOCK_RESTORE_ORIENTATION: &str = "bottom";

/// Hide the Dock: auto-hide with a long reveal delay, smallest tiles, and
/// only running apps shown.
#[must_use]
pub fn minimize_dock() -> ApplicationPlan {
    ApplicationPlan::builder("hide-dock")
        .alias("minimize-dock")
        .description("Auto-hide the Dock behind a long delay and shrink it")
        .directives([
            Directive::write(DOCK, "autohide", true),
            Directive::write(DOCK, "autohide-delay", 1000.0_f64),
            Directive::write(DOCK, "tilesize", 16_i64),
            Directive::write(DOCK, "static-only", true),
        ])
        .build()
        .with_restart_for_all(&RestartTarget::Dock)
}

/// Undo [`minimize_dock`] and pin the Dock to the bottom of the screen.
///
/// Deleting the keys falls back to the OS defaults; the orientation is
/// written explicitly instead of being left to the OS fallback.
///
/// The Dock restarts once, after the orientation write, so a single restart
/// picks up both the deletes and the orientation.
#[must_use]
pub fn restore_dock() -> ApplicationPlan {
    ApplicationPlan::builder("show-dock")
        .alias("restore-dock")
        .description("Remove the Dock tweaks and pin the Dock to the bottom")
        .directives(DOCK_MINIMIZE_KEYS.iter().map(|key| Directive::delete(DOCK, key)))
        .directive(Directive::write(DOCK, "orientation", DOCK_RESTORE_ORIENTATION))
        .build()
        .with_restart_for_all(&RestartTarget::Dock)
}

/// Turn off Siri, Spotlight suggestions, ad tracking and diagnostics upload.
#[must_use]
pub fn privacy_defaults() -> ApplicationPlan {
    let menu_bar = RestartTarget::SystemUiServer;
    ApplicationPlan::builder("apply-privacy-defaults")
        .alias("privacy")
        .description("Disable Siri, Spotlight suggestions, ad tracking and crash uploads")
        .directives([
            Directive::write("com.apple.assistant.support", "Assistant Enabled", false)
                .restarting(menu_bar.clone()),
            Directive::write("com.apple.Siri", "StatusMenuVisible", false)
                .restarting(menu_bar.clone()),
            Directive::write("com.apple.Siri", "UserHasDeclinedEnable", true),
            Directive::write("com.apple.Spotlight", "MenuItemHidden", 1_i64)
                .in_scope(Scope::CurrentHost)
                .restarting(menu_bar),
            Directive::write("com.apple.lookup.shared", "LookupSuggestionsDisabled", true),
            Directive::write("com.apple.AdLib", "allowApplePersonalizedAdvertising", false),
            Directive::write("com.apple.AdLib", "forceLimitAdTracking", true),
            Directive::write("com.apple.CrashReporter", "DialogType", "none"),
            Directive::write(DIAGNOSTICS_HISTORY, "AutoSubmit", false).in_scope(Scope::System),
            Directive::write(DIAGNOSTICS_HISTORY, "ThirdPartyDataSubmit", false)
                .in_scope(Scope::System),
        ])
        .build()
}

/// Clear every hot corner action and its modifier.
#[must_use]
pub fn disable_hot_corners() -> ApplicationPlan {
    let directives = ["tl", "tr", "bl", "br"].into_iter().flat_map(|corner| {
        [
            Directive::write(DOCK, &format!("wvous-{corner}-corner"), 0_i64),
            Directive::write(DOCK, &format!("wvous-{corner}-modifier"), 0_i64),
        ]
    });
    ApplicationPlan::builder("disable-hot-corners")
        .description("Clear all hot corner actions")
        .directives(directives)
        .build()
        .with_restart_for_all(&RestartTarget::Dock)
}

/// Silence interface sound effects and volume-change feedback.
#[must_use]
pub fn quiet_feedback() -> ApplicationPlan {
    ApplicationPlan::builder("quiet-feedback")
        .description("Disable UI sound effects and volume feedback")
        .directives([
            Directive::write("NSGlobalDomain", "com.apple.sound.beep.feedback", 0_i64),
            Directive::write("com.apple.systemsound", "com.apple.sound.uiaudio.enabled", 0_i64)
                .restarting(RestartTarget::SystemUiServer),
        ])
        .build()
}

/// Every plan compiled into the binary.
#[must_use]
pub fn builtin_plans() -> Vec<ApplicationPlan> {
    vec![
        minimize_dock(),
        restore_dock(),
        privacy_defaults(),
        disable_hot_corners(),
        quiet_feedback(),
    ]
}

impl ApplicationPlan {
    /// Attach `target` to every directive and rebuild the restart order.
    fn with_restart_for_all(self, target: &RestartTarget) -> Self {
        let Self {
            name,
            aliases,
            description,
            directives,
            restart_order,
        } = self;
        let mut builder = Self::builder(&name)
            .description(&description)
            .restart_order(restart_order)
            .directives(directives.into_iter().map(|d| d.restarting(target.clone())));
        for alias in &aliases {
            builder = builder.alias(alias);
        }
        builder.build()
    }
}

/// Built-in plans followed by user-defined plans.
///
/// Lookup prefers built-ins, so a user plan can never shadow one.
#[derive(Debug, Clone)]
pub struct Catalog {
    plans: Vec<ApplicationPlan>,
    builtin_len: usize,
}

impl Catalog {
    /// Catalog of the built-in plans only.
    #[must_use]
    pub fn builtin() -> Self {
        Self::with_user_plans(Vec::new())
    }

    /// Catalog of the built-in plans plus `user` plans.
    #[must_use]
    pub fn with_user_plans(user: Vec<ApplicationPlan>) -> Self {
        let mut plans = builtin_plans();
        let builtin_len = plans.len();
        plans.extend(user);
        Self { plans, builtin_len }
    }

    /// Find a plan by name or alias.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ApplicationPlan> {
        self.plans.iter().find(|p| p.answers_to(name))
    }

    /// All plans, built-ins first.
    #[must_use]
    pub fn plans(&self) -> &[ApplicationPlan] {
        &self.plans
    }

    /// Plans compiled into the binary.
    #[must_use]
    pub fn builtins(&self) -> &[ApplicationPlan] {
        self.plans.get(..self.builtin_len).unwrap_or_default()
    }

    /// Plans loaded from the user's plan file.
    #[must_use]
    pub fn user_plans(&self) -> &[ApplicationPlan] {
        self.plans.get(self.builtin_len..).unwrap_or_default()
    }
}
