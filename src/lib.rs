//! Declarative macOS preference engine.
//!
//! Named plans of `defaults` writes and deletes are applied against the
//! preference store, after which the services that cache those preferences
//! (Dock, `SystemUIServer`, ...) are restarted once each.
//!
//! The public API is organised into layers:
//!
//! - **[`directive`]** and **[`plan`]**: what to change, as data
//! - **[`store`]** and **[`services`]**: the OS seams, behind traits
//! - **[`applier`]**: the loop tying plans to stores and services
//! - **[`config`]**: user-defined plans from a TOML file
//! - **[`commands`]**: top-level subcommand orchestration (`apply`, `list`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod applier;
pub mod cli;
pub mod commands;
pub mod config;
pub mod directive;
pub mod error;
pub mod exec;
pub mod logging;
pub mod plan;
pub mod services;
pub mod store;
