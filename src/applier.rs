//! Plan application: run every directive, then the restarts they need.

use std::fmt;

use crate::directive::{Action, Directive, RestartTarget};
use crate::error::PrefError;
use crate::logging::{EntryStatus, Log};
use crate::plan::ApplicationPlan;
use crate::services::{RestartStatus, ServiceControl};
use crate::store::{Elevation, PreferenceStore, StoreChange};

/// What happened to one directive.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveOutcome {
    /// The store was changed.
    Applied,
    /// Nothing needed doing.
    Skipped {
        /// Why nothing was done.
        reason: String,
    },
    /// The store refused the change.
    Failed(PrefError),
}

/// A directive paired with its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveReport {
    /// The directive as declared in the plan.
    pub directive: Directive,
    /// What happened to it.
    pub outcome: DirectiveOutcome,
}

/// A restart that was attempted.
#[derive(Debug, Clone, PartialEq)]
pub struct RestartReport {
    /// The service.
    pub target: RestartTarget,
    /// Result of the restart request.
    pub result: Result<RestartStatus, PrefError>,
}

/// Outcome of applying one plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyResult {
    /// Per-directive outcomes, in plan order.
    pub outcomes: Vec<DirectiveReport>,
    /// Restarts performed, in restart order.
    pub restarts: Vec<RestartReport>,
    /// False iff a required directive or any restart failed.
    pub success: bool,
}

impl ApplyResult {
    /// Directives that failed, required or not.
    pub fn failures(&self) -> impl Iterator<Item = &DirectiveReport> {
        self.outcomes
            .iter()
            .filter(|r| matches!(r.outcome, DirectiveOutcome::Failed(_)))
    }

    /// Failed directives that make the run unsuccessful.
    pub fn required_failures(&self) -> impl Iterator<Item = &DirectiveReport> {
        self.failures().filter(|r| r.directive.is_required())
    }

    /// Restarts that failed.
    pub fn failed_restarts(&self) -> impl Iterator<Item = &RestartReport> {
        self.restarts.iter().filter(|r| r.result.is_err())
    }

    /// Targets of the restarts that were attempted, in order.
    #[must_use]
    pub fn restarted_targets(&self) -> Vec<&RestartTarget> {
        self.restarts.iter().map(|r| &r.target).collect()
    }
}

/// Applies [`ApplicationPlan`]s against a store and restarts services.
pub struct PreferenceApplier<'a> {
    store: &'a dyn PreferenceStore,
    services: &'a dyn ServiceControl,
    elevation: Elevation,
    log: &'a dyn Log,
}

impl fmt::Debug for PreferenceApplier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceApplier")
            .field("store", &self.store)
            .field("services", &"<dyn ServiceControl>")
            .field("elevation", &self.elevation)
            .field("log", &"<dyn Log>")
            .finish()
    }
}

impl<'a> PreferenceApplier<'a> {
    /// Create an applier over explicit collaborators.
    #[must_use]
    pub fn new(
        store: &'a dyn PreferenceStore,
        services: &'a dyn ServiceControl,
        elevation: Elevation,
        log: &'a dyn Log,
    ) -> Self {
        Self {
            store,
            services,
            elevation,
            log,
        }
    }

    /// Apply `plan`.
    ///
    /// Directive failures are recorded and never stop the run. Restarts run
    /// once per target after every directive, and only for targets touched
    /// by a directive that did not fail.
    pub fn apply(&self, plan: &ApplicationPlan) -> ApplyResult {
        let _plan = tracing::info_span!("plan", plan = plan.name()).entered();
        self.log.stage(&format!("Applying {}", plan.name()));

        let outcomes: Vec<DirectiveReport> = plan
            .directives()
            .iter()
            .map(|directive| DirectiveReport {
                directive: directive.clone(),
                outcome: self.apply_directive(directive),
            })
            .collect();

        let restarts: Vec<RestartReport> = plan
            .restarts_for(
                outcomes
                    .iter()
                    .filter(|r| !matches!(r.outcome, DirectiveOutcome::Failed(_)))
                    .map(|r| &r.directive),
            )
            .into_iter()
            .map(|target| self.restart(target))
            .collect();

        let mut result = ApplyResult {
            outcomes,
            restarts,
            success: false,
        };
        result.success =
            result.required_failures().next().is_none() && result.failed_restarts().next().is_none();
        result
    }

    fn apply_directive(&self, directive: &Directive) -> DirectiveOutcome {
        let desc = directive.to_string();
        let result = if let Some(reason) = self.elevation.refusal(directive.scope) {
            Err(PrefError::PermissionDenied {
                target: directive.target(),
                reason: reason.to_string(),
            })
        } else {
            match &directive.action {
                Action::Write(value) => self.store.write(directive, value),
                Action::Delete => self.store.delete(directive),
            }
        };

        let outcome = match result {
            Ok(StoreChange::Written | StoreChange::Deleted) => DirectiveOutcome::Applied,
            Ok(StoreChange::AlreadyAbsent) => DirectiveOutcome::Skipped {
                reason: "already absent".to_string(),
            },
            Err(e) => DirectiveOutcome::Failed(e),
        };

        match &outcome {
            DirectiveOutcome::Applied => {
                self.log.debug(&desc);
                self.log.record(&desc, EntryStatus::Applied, None);
            }
            DirectiveOutcome::Skipped { reason } => {
                self.log.debug(&format!("skipping {desc}: {reason}"));
                self.log.record(&desc, EntryStatus::Skipped, Some(reason));
            }
            DirectiveOutcome::Failed(e) if directive.is_required() => {
                self.log.error(&e.to_string());
                self.log.record(&desc, EntryStatus::Failed, Some(e.kind()));
            }
            DirectiveOutcome::Failed(e) => {
                self.log.warn(&format!("{e} (best effort)"));
                self.log.record(&desc, EntryStatus::Skipped, Some(e.kind()));
            }
        }
        outcome
    }

    fn restart(&self, target: &RestartTarget) -> RestartReport {
        let name = target.to_string();
        let result = self.services.restart(target);
        match &result {
            Ok(RestartStatus::Restarted) => {
                self.log.debug(&format!("restarted {name}"));
                self.log.record(&name, EntryStatus::Restarted, None);
            }
            Ok(RestartStatus::NotRunning) => {
                self.log.debug(&format!("{name} not running"));
                self.log
                    .record(&name, EntryStatus::Restarted, Some("not running"));
            }
            Err(e) => {
                self.log.error(&e.to_string());
                self.log.record(&name, EntryStatus::Failed, Some(e.kind()));
            }
        }
        RestartReport {
            target: target.clone(),
            result,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::directive::{PrefValue, Scope};
    use crate::logging::isolated_logger;
    use crate::plan::catalog::{DOCK_MINIMIZE_KEYS, minimize_dock, restore_dock};
    use crate::services::MockServiceControl;
    use crate::store::MemoryStore;

    /// Services that always restart successfully and count calls.
    fn restarting_services() -> MockServiceControl {
        let mut services = MockServiceControl::new();
        services
            .expect_restart()
            .returning(|_| Ok(RestartStatus::Restarted));
        services
    }

    #[test]
    fn single_write_scenario() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = MemoryStore::new();
        let mut services = MockServiceControl::new();
        services
            .expect_restart()
            .withf(|t| *t == RestartTarget::Dock)
            .times(1)
            .returning(|_| Ok(RestartStatus::Restarted));
        let plan = ApplicationPlan::builder("scenario")
            .directive(
                Directive::write("com.example.dock", "autohide", true)
                    .restarting(RestartTarget::Dock),
            )
            .build();

        let result =
            PreferenceApplier::new(&store, &services, Elevation::Unavailable, &log).apply(&plan);

        assert_eq!(result.outcomes.len(), 1);
        assert_eq!(result.outcomes[0].outcome, DirectiveOutcome::Applied);
        assert_eq!(result.restarted_targets(), vec![&RestartTarget::Dock]);
        assert!(result.success);
        assert_eq!(
            store.get("com.example.dock", "autohide"),
            Some(PrefValue::Boolean(true))
        );
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = MemoryStore::new();
        let services = restarting_services();
        let applier = PreferenceApplier::new(&store, &services, Elevation::Unavailable, &log);
        let plan = minimize_dock();

        let first = applier.apply(&plan);
        let second = applier.apply(&plan);

        assert_eq!(second.failures().count(), 0);
        assert!(second.success);
        assert_eq!(first.restarted_targets(), second.restarted_targets());
        assert_eq!(first.outcomes, second.outcomes);
    }

    #[test]
    fn show_dock_inverts_hide_dock() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = MemoryStore::new();
        let services = restarting_services();
        let applier = PreferenceApplier::new(&store, &services, Elevation::Unavailable, &log);

        assert!(applier.apply(&minimize_dock()).success);
        let restored = applier.apply(&restore_dock());

        assert!(restored.success);
        for key in DOCK_MINIMIZE_KEYS {
            assert_eq!(store.get("com.apple.dock", key), None, "{key} left behind");
        }
        assert_eq!(
            store.get("com.apple.dock", "orientation"),
            Some(PrefValue::from("bottom"))
        );
        assert_eq!(restored.restarted_targets(), vec![&RestartTarget::Dock]);
    }

    #[test]
    fn restart_runs_once_after_all_directives() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = Arc::new(MemoryStore::new());
        let observed = Arc::clone(&store);
        let mut services = MockServiceControl::new();
        services
            .expect_restart()
            .times(1)
            .returning(move |_| {
                assert!(observed.get("com.apple.dock", "a").is_some());
                assert!(observed.get("com.apple.dock", "b").is_some());
                Ok(RestartStatus::Restarted)
            });
        let plan = ApplicationPlan::builder("two")
            .directive(Directive::write("com.apple.dock", "a", true).restarting(RestartTarget::Dock))
            .directive(Directive::write("com.apple.dock", "b", true).restarting(RestartTarget::Dock))
            .build();

        let result =
            PreferenceApplier::new(store.as_ref(), &services, Elevation::Sudo, &log).apply(&plan);
        assert_eq!(result.restarts.len(), 1);
        assert!(result.success);
    }

    #[test]
    fn failure_is_isolated() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = MemoryStore::new();
        let mut services = MockServiceControl::new();
        services
            .expect_restart()
            .withf(|t| *t == RestartTarget::Dock)
            .times(1)
            .returning(|_| Ok(RestartStatus::Restarted));
        let plan = ApplicationPlan::builder("partial")
            .directive(Directive::write("com.apple.dock", "one", true))
            .directive(
                Directive::write("com.apple.loginwindow", "two", false)
                    .in_scope(Scope::System)
                    .restarting(RestartTarget::Finder),
            )
            .directive(Directive::write("com.apple.dock", "three", true).restarting(RestartTarget::Dock))
            .build();

        let result =
            PreferenceApplier::new(&store, &services, Elevation::Unavailable, &log).apply(&plan);

        assert_eq!(result.outcomes[0].outcome, DirectiveOutcome::Applied);
        assert!(matches!(
            result.outcomes[1].outcome,
            DirectiveOutcome::Failed(PrefError::PermissionDenied { .. })
        ));
        assert_eq!(result.outcomes[2].outcome, DirectiveOutcome::Applied);
        assert_eq!(result.restarted_targets(), vec![&RestartTarget::Dock]);
        assert!(!result.success);
        assert_eq!(log.failure_count(), 1);
    }

    #[test]
    fn system_scope_with_elevation_reaches_store() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = MemoryStore::new();
        let services = MockServiceControl::new();
        let plan = ApplicationPlan::builder("sys")
            .directive(Directive::write("/tmp/x.plist", "AutoSubmit", false).in_scope(Scope::System))
            .build();

        let result = PreferenceApplier::new(&store, &services, Elevation::Sudo, &log).apply(&plan);
        assert!(result.success);
        assert_eq!(
            store.get_scoped(Scope::System, "/tmp/x.plist", "AutoSubmit"),
            Some(PrefValue::Boolean(false))
        );
    }

    #[test]
    fn deleting_absent_key_is_skipped() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = MemoryStore::new();
        let services = restarting_services();
        let plan = ApplicationPlan::builder("del")
            .directive(Directive::delete("com.apple.dock", "tilesize").restarting(RestartTarget::Dock))
            .build();

        let result =
            PreferenceApplier::new(&store, &services, Elevation::Unavailable, &log).apply(&plan);
        assert!(matches!(
            result.outcomes[0].outcome,
            DirectiveOutcome::Skipped { .. }
        ));
        assert!(result.success);
        assert_eq!(result.restarts.len(), 1, "skipped directives still restart");
    }

    #[test]
    fn best_effort_failure_keeps_success() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = MemoryStore::new().reject_key("flaky");
        let services = MockServiceControl::new();
        let plan = ApplicationPlan::builder("be")
            .directive(Directive::write("d", "flaky", 1_i64).best_effort())
            .build();

        let result =
            PreferenceApplier::new(&store, &services, Elevation::Unavailable, &log).apply(&plan);
        assert_eq!(result.failures().count(), 1);
        assert!(result.success);
    }

    #[test]
    fn key_rejected_is_distinct_from_permission_denied() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = MemoryStore::new().reject_key("tilesize");
        let services = MockServiceControl::new();
        let plan = ApplicationPlan::builder("bad")
            .directive(Directive::write("com.apple.dock", "tilesize", "huge"))
            .build();

        let result =
            PreferenceApplier::new(&store, &services, Elevation::Sudo, &log).apply(&plan);
        let DirectiveOutcome::Failed(err) = &result.outcomes[0].outcome else {
            panic!("expected failure");
        };
        assert_eq!(err.kind(), "key-rejected");
        assert!(!result.success);
    }

    #[test]
    fn restart_failure_fails_run() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = MemoryStore::new();
        let mut services = MockServiceControl::new();
        services.expect_restart().returning(|t| {
            Err(PrefError::RestartFailed {
                service: t.to_string(),
                reason: "boom".to_string(),
            })
        });

        let result =
            PreferenceApplier::new(&store, &services, Elevation::Unavailable, &log)
                .apply(&minimize_dock());
        assert_eq!(result.failures().count(), 0);
        assert!(!result.success);
        assert!(result.restarts[0].result.is_err());
    }

    #[test]
    fn not_running_is_success() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = MemoryStore::new();
        let mut services = MockServiceControl::new();
        services
            .expect_restart()
            .returning(|_| Ok(RestartStatus::NotRunning));

        let result =
            PreferenceApplier::new(&store, &services, Elevation::Unavailable, &log)
                .apply(&minimize_dock());
        assert!(result.success);
    }

    #[test]
    fn failed_directives_do_not_restart() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = MemoryStore::new().unavailable_domain("com.apple.dock");
        let mut services = MockServiceControl::new();
        services.expect_restart().never();

        let result =
            PreferenceApplier::new(&store, &services, Elevation::Unavailable, &log)
                .apply(&minimize_dock());
        assert_eq!(result.failures().count(), 4);
        assert!(result.restarts.is_empty());
        assert!(!result.success);
    }

    #[test]
    fn summary_entries_are_recorded() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = MemoryStore::new();
        let services = restarting_services();
        PreferenceApplier::new(&store, &services, Elevation::Unavailable, &log)
            .apply(&restore_dock());
        let statuses: Vec<EntryStatus> = log.entries().iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                EntryStatus::Skipped,
                EntryStatus::Skipped,
                EntryStatus::Skipped,
                EntryStatus::Skipped,
                EntryStatus::Applied,
                EntryStatus::Restarted,
            ]
        );
    }

    #[test]
    fn root_without_invoking_user_refuses_user_scope() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = MemoryStore::new();
        let mut services = MockServiceControl::new();
        services.expect_restart().never();
        let root = Elevation::Root {
            invoking_user: None,
        };

        let result = PreferenceApplier::new(&store, &services, root, &log).apply(&minimize_dock());

        assert_eq!(result.failures().count(), DOCK_MINIMIZE_KEYS.len());
        assert!(result.failures().all(|r| matches!(
            r.outcome,
            DirectiveOutcome::Failed(PrefError::PermissionDenied { .. })
        )));
        assert!(store.is_empty(), "nothing may land in root's preferences");
        assert!(!result.success);
    }

    #[test]
    fn root_with_invoking_user_applies_every_scope() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = MemoryStore::new();
        let services = restarting_services();
        let plan = ApplicationPlan::builder("mixed")
            .directive(Directive::write("com.apple.dock", "autohide", true))
            .directive(Directive::write("/tmp/x.plist", "AutoSubmit", false).in_scope(Scope::System))
            .build();

        let result =
            PreferenceApplier::new(&store, &services, Elevation::root_for("alice"), &log).apply(&plan);
        assert!(result.success);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn store_denial_is_isolated_like_missing_elevation() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = MemoryStore::new().deny_scope(Scope::CurrentHost);
        let services = restarting_services();
        let plan = ApplicationPlan::builder("host")
            .directive(
                Directive::write("com.apple.Spotlight", "MenuItemHidden", 1_i64)
                    .in_scope(Scope::CurrentHost)
                    .restarting(RestartTarget::SystemUiServer),
            )
            .directive(Directive::write("com.apple.dock", "autohide", true).restarting(RestartTarget::Dock))
            .build();

        let result = PreferenceApplier::new(&store, &services, Elevation::Sudo, &log).apply(&plan);

        assert_eq!(result.required_failures().count(), 1);
        assert_eq!(result.restarted_targets(), vec![&RestartTarget::Dock]);
        assert!(!result.success);
    }

    #[test]
    fn show_dock_over_hidden_dock_deletes_existing_keys() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = DOCK_MINIMIZE_KEYS.iter().fold(MemoryStore::new(), |store, key| {
            store.with_value(Scope::CurrentUser, "com.apple.dock", key, PrefValue::Boolean(true))
        });
        let services = restarting_services();

        let result = PreferenceApplier::new(&store, &services, Elevation::Unavailable, &log)
            .apply(&restore_dock());

        assert!(result
            .outcomes
            .iter()
            .all(|r| r.outcome == DirectiveOutcome::Applied));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn declared_restart_without_directive_is_not_run() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = MemoryStore::new();
        let mut services = MockServiceControl::new();
        services
            .expect_restart()
            .withf(|t| *t == RestartTarget::Finder)
            .times(1)
            .returning(|_| Ok(RestartStatus::Restarted));
        let plan = ApplicationPlan::builder("declared")
            .restart_order([RestartTarget::Cfprefsd])
            .directive(
                Directive::write("com.apple.finder", "ShowPathbar", true)
                    .restarting(RestartTarget::Finder),
            )
            .build();

        let result =
            PreferenceApplier::new(&store, &services, Elevation::Unavailable, &log).apply(&plan);
        assert_eq!(result.restarted_targets(), vec![&RestartTarget::Finder]);
    }

    #[test]
    fn outcomes_are_logged_with_plan_name() {
        let (log, _tmp, _guard) = isolated_logger();
        let store = MemoryStore::new().reject_key("tilesize");
        let services = restarting_services();

        PreferenceApplier::new(&store, &services, Elevation::Unavailable, &log)
            .apply(&minimize_dock());

        let contents = std::fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(
            contents.contains("[outcome] write com.apple.dock autohide = true (boolean) status=applied plan=hide-dock"),
            "{contents}"
        );
        assert!(contents.contains(
            "[outcome] write com.apple.dock tilesize = 16 (integer) status=failed reason=key-rejected plan=hide-dock"
        ));
        assert!(contents.contains("[outcome] Dock status=restarted plan=hide-dock"));
    }
}
