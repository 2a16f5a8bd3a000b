#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for user-defined plan files.
//!
//! These tests load plan files from temporary directories, verifying that:
//! - a missing file means "built-ins only"
//! - user plans are found by name and alias and can be applied
//! - shadowing, empty plans and duplicate keys produce warnings
//! - malformed directives are reported with their plan and position

mod common;

use common::{PlanFile, QuietLog, RecordingServices};
use macprefs_cli::applier::PreferenceApplier;
use macprefs_cli::config::{Config, plans_file_path};
use macprefs_cli::directive::{PrefValue, RestartTarget, Scope};
use macprefs_cli::error::ConfigError;
use macprefs_cli::plan::builtin_plans;
use macprefs_cli::store::{Elevation, MemoryStore};

const FINDER_PLANS: &str = r#"
[finder-tweaks]
description = "Show the Finder path bar and status bar"
aliases = ["finder"]

[[finder-tweaks.directives]]
domain = "com.apple.finder"
key = "ShowPathbar"
value = true
restart = ["Finder"]

[[finder-tweaks.directives]]
domain = "com.apple.finder"
key = "ShowStatusBar"
value = true
restart = ["Finder"]

[[finder-tweaks.directives]]
domain = "com.apple.finder"
key = "_FXSortFoldersFirst"
scope = "host"
"#;

/// A missing plan file loads the built-in catalog only.
#[test]
fn missing_file_has_builtins_only() {
    let file = PlanFile::missing();
    let config = file.load();
    assert_eq!(config.catalog.plans().len(), builtin_plans().len());
    assert!(config.catalog.user_plans().is_empty());
    assert!(config.warnings.is_empty());
}

/// The `--plans` path takes precedence over every other source.
#[test]
fn explicit_plans_path_is_used() {
    let file = PlanFile::new(FINDER_PLANS);
    assert_eq!(plans_file_path(Some(file.path())), file.path());
}

/// A user plan is found by alias and applies with a single Finder restart.
#[test]
fn user_plan_applies() {
    let file = PlanFile::new(FINDER_PLANS);
    let config = file.load();
    let plan = config.catalog.find("finder").expect("finder plan");
    assert_eq!(plan.name(), "finder-tweaks");

    let store = MemoryStore::new();
    let services = RecordingServices::default();
    let log = QuietLog::default();
    let result = PreferenceApplier::new(&store, &services, Elevation::Unavailable, &log).apply(plan);

    assert!(result.success);
    assert_eq!(
        store.get("com.apple.finder", "ShowPathbar"),
        Some(PrefValue::Boolean(true))
    );
    assert_eq!(services.restarted(), vec![RestartTarget::Finder]);
    assert_eq!(plan.directives()[2].scope, Scope::CurrentHost);
}

/// Shadowing a built-in warns and the built-in still wins.
#[test]
fn shadowing_builtin_warns() {
    let file = PlanFile::new(
        r#"
        [hide-dock]
        [[hide-dock.directives]]
        domain = "com.apple.dock"
        key = "autohide"
        value = false
        "#,
    );
    let config = file.load();
    assert_eq!(config.warnings.len(), 1);
    assert!(config.warnings[0].message.contains("shadowed"));
    let found = config.catalog.find("hide-dock").unwrap();
    assert_eq!(found.directives().len(), 4);
}

/// Empty plans and duplicate keys warn but still load.
#[test]
fn empty_and_duplicate_warn() {
    let file = PlanFile::new(
        r#"
        [empty]
        description = "nothing yet"

        [dup]
        directives = [
            { domain = "com.apple.dock", key = "tilesize", value = 32 },
            { domain = "com.apple.dock", key = "tilesize", value = 48 },
        ]
        "#,
    );
    let config = file.load();
    let plans: Vec<&str> = config.warnings.iter().map(|w| w.plan.as_str()).collect();
    assert_eq!(plans, vec!["dup", "empty"]);
    assert!(config.catalog.find("empty").is_some());
}

/// A malformed directive fails loading with its plan and position.
#[test]
fn malformed_directive_is_an_error() {
    let file = PlanFile::new(
        r#"
        [bad]
        directives = [
            { domain = "com.apple.dock", key = "autohide", value = true },
            { domain = "com.apple.dock", key = "tilesize", value = 16, action = "delete" },
        ]
        "#,
    );
    let err = Config::load(file.path()).unwrap_err();
    assert!(
        matches!(&err, ConfigError::InvalidDirective { plan, index: 1, .. } if plan == "bad"),
        "{err:?}"
    );
}

/// Invalid TOML is a syntax error naming the file.
#[test]
fn invalid_toml_is_an_error() {
    let file = PlanFile::new("[unterminated\n");
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSyntax { .. }));
}
