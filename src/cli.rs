//! Command-line interface definitions.
use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Top-level CLI entry point for the macOS preference engine.
#[derive(Parser, Debug)]
#[command(
    name = "macprefs",
    about = "Apply named sets of macOS preference changes",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Print the commands that would run without changing anything
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Plan file with user-defined plans
    #[arg(long, global = true, value_name = "PATH")]
    pub plans: Option<std::path::PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply a named plan
    Apply(ApplyOpts),
    /// List available plans
    List,
    /// Generate shell completions
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the per-command log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Apply(_) => "apply",
            Self::List => "list",
            Self::Completions(_) => "completions",
            Self::Version => "version",
        }
    }
}

/// Options for the `apply` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ApplyOpts {
    /// Plan name or alias (see `macprefs list`)
    pub plan: String,
}

/// Options for the `completions` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CompletionsOpts {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}
