//! `macprefs` binary entry point.
use anyhow::Result;
use clap::Parser;

use macprefs_cli::cli::{Cli, Command};
use macprefs_cli::{commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    match &args.command {
        Command::Completions(opts) => {
            commands::completions::run(opts.shell);
            return Ok(());
        }
        Command::Version => {
            commands::version::run();
            return Ok(());
        }
        Command::Apply(_) | Command::List => {}
    }

    logging::init_subscriber(args.verbose, args.command.name());
    let log = logging::Logger::new(args.command.name());

    match &args.command {
        Command::Apply(opts) => commands::apply::run(&args.global, opts, &log),
        Command::List => commands::list::run(&args.global, &log),
        Command::Completions(_) | Command::Version => Ok(()),
    }
}
