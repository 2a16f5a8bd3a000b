//! Command: apply a named plan.
use anyhow::{Context as _, Result, bail};

use super::CommandSetup;
use crate::applier::{ApplyResult, PreferenceApplier};
use crate::cli::{ApplyOpts, GlobalOpts};
use crate::directive::{RestartTarget, Scope};
use crate::exec::{Executor, SystemExecutor, render_command};
use crate::logging::{EntryStatus, Log, Logger};
use crate::plan::ApplicationPlan;
use crate::services::KillallServices;
use crate::store::{DefaultsStore, Elevation};

/// Run the `apply` subcommand.
///
/// # Errors
///
/// Returns an error if the plan file cannot be loaded, the plan is unknown,
/// or the plan did not apply successfully.
pub fn run(global: &GlobalOpts, opts: &ApplyOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let plan = setup
        .config
        .catalog
        .find(&opts.plan)
        .with_context(|| format!("unknown plan '{}' (see `macprefs list`)", opts.plan))?;

    apply_plan(plan, &SystemExecutor, global.dry_run, log)
}

/// Apply `plan` through `executor`, print the summary, and fail unless the
/// run succeeded. A dry run always succeeds.
///
/// # Errors
///
/// Returns an error naming the failed required directives and restarts.
pub fn apply_plan(
    plan: &ApplicationPlan,
    executor: &dyn Executor,
    dry_run: bool,
    log: &Logger,
) -> Result<()> {
    let result = execute(plan, executor, dry_run, log);
    log.print_summary();

    match result {
        Some(result) if !result.success => {
            bail!(
                "plan '{}' did not apply cleanly: {} required directive(s) and {} restart(s) failed",
                plan.name(),
                result.required_failures().count(),
                result.failed_restarts().count()
            )
        }
        _ => Ok(()),
    }
}

/// Apply `plan` through `executor`, or only describe it when `dry_run` is set.
///
/// Returns `None` for a dry run.
pub fn execute(
    plan: &ApplicationPlan,
    executor: &dyn Executor,
    dry_run: bool,
    log: &dyn Log,
) -> Option<ApplyResult> {
    let elevation = detect_elevation(plan, executor, log);
    let store = DefaultsStore::new(executor, elevation.clone());

    if dry_run {
        preview(plan, &store, &elevation, log);
        return None;
    }

    let services = KillallServices::new(executor);
    Some(PreferenceApplier::new(&store, &services, elevation, log).apply(plan))
}

/// Check for root always, and for `sudo -n` only when the plan has
/// system-scope directives.
fn detect_elevation(plan: &ApplicationPlan, executor: &dyn Executor, log: &dyn Log) -> Elevation {
    let needs_system = plan.directives().iter().any(|d| d.scope == Scope::System);
    let elevation = Elevation::detect(executor, needs_system);
    log.debug(&format!("elevation: {elevation}"));
    if needs_system && !elevation.is_available() {
        log.warn("system-scope directives need root or passwordless sudo; they will fail");
    }
    if let Some(reason) = elevation.refusal(Scope::CurrentUser)
        && plan.directives().iter().any(|d| d.scope != Scope::System)
    {
        log.warn(&format!("user-scope directives will fail: {reason}"));
    }
    elevation
}

/// Log the commands `plan` would run and record dry-run entries.
///
/// Directives the elevation refuses are listed as such, and their restarts
/// are left out, matching what a real run does.
fn preview(plan: &ApplicationPlan, store: &DefaultsStore<'_>, elevation: &Elevation, log: &dyn Log) {
    let _plan = tracing::info_span!("plan", plan = plan.name()).entered();
    log.stage(&format!("Applying {} (dry run)", plan.name()));

    let mut runnable = Vec::new();
    for directive in plan.directives() {
        if let Some(reason) = elevation.refusal(directive.scope) {
            log.dry_run(&format!("refused: {directive} ({reason})"));
            log.record(&directive.to_string(), EntryStatus::DryRun, Some(reason));
        } else {
            log.dry_run(&store.invocation(directive).to_string());
            log.record(&directive.to_string(), EntryStatus::DryRun, None);
            runnable.push(directive);
        }
    }
    for target in plan.restarts_for(runnable) {
        log.dry_run(&restart_command(target));
        log.record(&target.to_string(), EntryStatus::DryRun, Some("restart"));
    }
}

fn restart_command(target: &RestartTarget) -> String {
    let process = target.process_name();
    let kill = render_command("killall", &[process]);
    if target.relaunches_itself() {
        kill
    } else {
        format!("{kill} && {}", render_command("open", &["-a", process]))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::directive::Directive;
    use crate::exec::test_helpers::{MockExecutor, fail, ok};
    use crate::logging::isolated_logger;
    use crate::plan::catalog::{minimize_dock, privacy_defaults, quiet_feedback, restore_dock};

    /// `id -u` answer for an ordinary user.
    fn not_root() -> crate::exec::ExecResult {
        ok("501\n")
    }

    fn dry_run_lines(log: &Logger) -> Vec<String> {
        let contents = std::fs::read_to_string(log.log_path().unwrap()).unwrap();
        contents
            .lines()
            .filter_map(|l| l.split_once("[dry run] ").map(|(_, cmd)| cmd.to_string()))
            .collect()
    }

    #[test]
    fn dry_run_issues_no_changes() {
        let (log, _tmp, _guard) = isolated_logger();
        let executor = MockExecutor::with_results(vec![not_root()]);
        assert!(execute(&restore_dock(), &executor, true, &log).is_none());
        assert_eq!(executor.calls(), vec!["id -u"]);
        let entries = log.entries();
        assert_eq!(entries.len(), 6);
        assert!(entries.iter().all(|e| e.status == EntryStatus::DryRun));
    }

    #[test]
    fn dry_run_log_lists_commands() {
        let (log, _tmp, _guard) = isolated_logger();
        let executor = MockExecutor::with_results(vec![not_root()]);
        execute(&minimize_dock(), &executor, true, &log);
        insta::assert_snapshot!(dry_run_lines(&log).join("\n"), @r"
        defaults write com.apple.dock autohide -bool true
        defaults write com.apple.dock autohide-delay -float 1000
        defaults write com.apple.dock tilesize -int 16
        defaults write com.apple.dock static-only -bool true
        killall Dock
        ");
    }

    #[test]
    fn dry_run_lists_only_restarts_a_real_run_performs() {
        let plan = ApplicationPlan::builder("finder")
            .restart_order([RestartTarget::Cfprefsd])
            .directive(
                Directive::write("com.apple.finder", "ShowPathbar", true)
                    .restarting(RestartTarget::Finder),
            )
            .build();

        let (log, _tmp, _guard) = isolated_logger();
        let executor = MockExecutor::with_results(vec![not_root()]);
        execute(&plan, &executor, true, &log);
        let previewed = dry_run_lines(&log);

        let real = MockExecutor::with_results(vec![not_root(), ok(""), ok("")]);
        let result = execute(&plan, &real, false, &log).expect("result");

        assert_eq!(previewed.last().map(String::as_str), Some("killall Finder"));
        assert!(!previewed.iter().any(|l| l.contains("cfprefsd")));
        assert_eq!(result.restarted_targets(), vec![&RestartTarget::Finder]);
    }

    #[test]
    fn dry_run_without_elevation_drops_refused_restarts() {
        let plan = ApplicationPlan::builder("sys")
            .directive(
                Directive::write("com.apple.loginwindow", "GuestEnabled", false)
                    .in_scope(Scope::System)
                    .restarting(RestartTarget::Cfprefsd),
            )
            .build();
        let (log, _tmp, _guard) = isolated_logger();
        let executor = MockExecutor::with_results(vec![not_root()]);
        execute(&plan, &executor, true, &log);

        let lines = dry_run_lines(&log);
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert!(lines[0].starts_with("refused: write com.apple.loginwindow GuestEnabled"));
    }

    #[test]
    fn app_restart_preview_relaunches() {
        assert_eq!(
            restart_command(&RestartTarget::from("Safari")),
            "killall Safari && open -a Safari"
        );
        assert_eq!(restart_command(&RestartTarget::Finder), "killall Finder");
    }

    #[test]
    fn hide_dock_runs_writes_then_one_restart() {
        let (log, _tmp, _guard) = isolated_logger();
        let mut results = vec![not_root()];
        results.extend(vec![ok(""); 5]);
        let executor = MockExecutor::with_results(results);
        let result = execute(&minimize_dock(), &executor, false, &log).expect("result");
        assert!(result.success);
        let calls = executor.calls();
        assert_eq!(calls.len(), 6);
        assert_eq!(calls.last().map(String::as_str), Some("killall Dock"));
    }

    #[test]
    fn show_dock_on_clean_store_skips_deletes() {
        let (log, _tmp, _guard) = isolated_logger();
        let absent = fail("The domain/default pair of (com.apple.dock, autohide) does not exist");
        let executor = MockExecutor::with_results(vec![
            not_root(),
            absent.clone(),
            absent.clone(),
            absent.clone(),
            absent,
            ok(""),
            ok(""),
        ]);
        let result = execute(&restore_dock(), &executor, false, &log).expect("result");
        assert!(result.success);
        assert_eq!(
            executor.calls()[5],
            "defaults write com.apple.dock orientation -string bottom"
        );
    }

    #[test]
    fn privacy_without_elevation_fails_only_system_directives() {
        let (log, _tmp, _guard) = isolated_logger();
        let user_directives = privacy_defaults()
            .directives()
            .iter()
            .filter(|d| d.scope != Scope::System)
            .count();
        // id -u, then one result per user/host directive, then SystemUIServer.
        let mut results = vec![not_root()];
        results.extend(vec![ok(""); user_directives + 1]);
        let executor = MockExecutor::with_results(results);

        let result = execute(&privacy_defaults(), &executor, false, &log).expect("result");

        assert!(!result.success);
        assert_eq!(result.failures().count(), 2);
        assert!(result.failures().all(|r| r.directive.scope == Scope::System));
        assert_eq!(result.restarts.len(), 1);
        assert!(!executor.calls().iter().any(|c| c.contains("DiagnosticMessagesHistory")));
    }

    #[test]
    fn user_only_plan_does_not_probe_sudo() {
        let (log, _tmp, _guard) = isolated_logger();
        let plan = ApplicationPlan::builder("p")
            .directive(Directive::write("com.apple.finder", "ShowPathbar", true))
            .build();
        let executor = MockExecutor::with_results(vec![not_root(), ok("")]).with_which(true);
        let result = execute(&plan, &executor, false, &log).expect("result");
        assert!(result.success);
        assert_eq!(
            executor.calls(),
            vec!["id -u", "defaults write com.apple.finder ShowPathbar -bool true"]
        );
    }

    #[test]
    fn apply_plan_succeeds_for_clean_run() {
        let (log, _tmp, _guard) = isolated_logger();
        let executor = MockExecutor::with_results(vec![not_root(), ok(""), ok(""), ok("")]);
        apply_plan(&quiet_feedback(), &executor, false, &log).expect("clean run");
    }

    #[test]
    fn apply_plan_fails_for_required_directive() {
        let (log, _tmp, _guard) = isolated_logger();
        let executor = MockExecutor::with_results(vec![
            not_root(),
            ok(""),
            fail("Could not parse: 0.  Try single-quoting it."),
        ]);
        let err = apply_plan(&quiet_feedback(), &executor, false, &log).unwrap_err();
        assert_eq!(
            err.to_string(),
            "plan 'quiet-feedback' did not apply cleanly: 1 required directive(s) and 0 restart(s) failed"
        );
    }

    #[test]
    fn apply_plan_fails_for_restart() {
        let (log, _tmp, _guard) = isolated_logger();
        let executor = MockExecutor::with_results(vec![
            not_root(),
            ok(""),
            ok(""),
            fail("killall: permission denied"),
        ]);
        let err = apply_plan(&quiet_feedback(), &executor, false, &log).unwrap_err();
        assert!(err.to_string().ends_with("0 required directive(s) and 1 restart(s) failed"));
    }

    #[test]
    fn apply_plan_ignores_best_effort_failures() {
        let (log, _tmp, _guard) = isolated_logger();
        let plan = ApplicationPlan::builder("be")
            .directive(Directive::write("com.apple.dock", "flaky", 1_i64).best_effort())
            .directive(Directive::write("com.apple.dock", "solid", 1_i64))
            .build();
        let executor = MockExecutor::with_results(vec![not_root(), fail("Could not parse"), ok("")]);
        apply_plan(&plan, &executor, false, &log).expect("best-effort failure is not fatal");
    }

    #[test]
    fn apply_plan_dry_run_succeeds() {
        let (log, _tmp, _guard) = isolated_logger();
        let executor = MockExecutor::with_results(vec![not_root()]);
        apply_plan(&privacy_defaults(), &executor, true, &log).expect("dry run");
        assert_eq!(executor.calls(), vec!["id -u"]);
    }
}
