//! Command: print version information.

/// Version string: `MACPREFS_VERSION` from the build, else the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("MACPREFS_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the macprefs version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("macprefs {}", version());
}
