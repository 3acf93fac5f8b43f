use tracing_subscriber::{fmt, EnvFilter};

/// Initialize structured logging with environment filter.
/// Set RVL_LOG=debug (or trace, info, warn, error) for verbosity control.
/// `default_filter` is used when RVL_LOG is unset or invalid.
///
/// A layer is loaded into processes that may already own a global subscriber
/// (or may create several instances), so a second install is silently ignored.
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_env("RVL_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}
