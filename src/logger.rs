//! Diagnostic logging.
//!
//! Status lines meant for the user go through [Report]. Everything else (commands being spawned,
//! why a step decided to act) is emitted with `tracing` and shown only when asked for, e.g.
//! `HOMESTEAD_LOG=debug homestead-keys`.
//!
//! [Report]: crate::run_plan::report::Report

use tracing_subscriber::EnvFilter;

/// The environment variable holding the log filter.
pub const LOG_ENV: &str = "HOMESTEAD_LOG";

/// The filter used when [LOG_ENV] is unset or invalid.
pub const DEFAULT_FILTER: &str = "warn";

/// Installs the global subscriber, writing to stderr. Calling it again is harmless.
pub fn init() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
