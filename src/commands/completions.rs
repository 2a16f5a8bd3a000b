//! Command: generate shell completions.
use std::io::Write;

use clap::CommandFactory as _;
use clap_complete::Shell;

use crate::cli::Cli;

/// Write the completion script for `shell` to `out`.
pub fn write(shell: Shell, out: &mut dyn Write) {
    clap_complete::generate(shell, &mut Cli::command(), "macprefs", out);
}

/// Print the completion script for `shell` to stdout.
pub fn run(shell: Shell) {
    write(shell, &mut std::io::stdout());
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bash_script_mentions_subcommands() {
        let mut out = Vec::new();
        write(Shell::Bash, &mut out);
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("macprefs"));
        assert!(script.contains("apply"));
        assert!(script.contains("completions"));
    }
}
