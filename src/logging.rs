//! Diagnostic logging setup
//!
//! Log records go to stderr so stdout carries only command output.

use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV: &str = "REQCHECK_LOG";

/// Default directive for the given verbosity flags
pub fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "reqcheck=debug,warn"
    } else if quiet {
        "error"
    } else {
        "warn"
    }
}

/// Build the filter, preferring `REQCHECK_LOG` when it parses
pub fn env_filter(verbose: bool, quiet: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)))
}

/// Install the global subscriber; later calls are ignored
pub fn init(verbose: bool, quiet: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose, quiet))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
