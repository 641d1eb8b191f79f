//! Log output setup. Logs go to stderr; stdout belongs to the compiler.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a log filter directive.
pub const LOG_ENV: &str = "MEMOCC_LOG";

/// Installs the global subscriber.
///
/// `--verbose` and `--quiet` win over `$MEMOCC_LOG`; with neither, the
/// variable is used if set and valid, else only warnings are shown.
pub fn init(verbose: bool, quiet: bool) {
    let filter = match flag_level(verbose, quiet) {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn flag_level(verbose: bool, quiet: bool) -> Option<&'static str> {
    if quiet {
        Some("error")
    } else if verbose {
        Some("debug")
    } else {
        None
    }
}
