//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the level chosen by the flags.
pub const LOG_ENV: &str = "PYRO_LOG";

/// Returns the default filter directive for the given flags.
pub fn default_level(quiet: bool, verbose: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Installs the global subscriber, writing to stderr.
///
/// A subscriber that is already installed is left in place.
pub fn init_tracing(quiet: bool, verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_level(quiet, verbose)));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        eprintln!("warning: failed to initialize logging: {e}");
    }
}
