//! Logging setup shared by both binaries

use tracing_subscriber::EnvFilter;

/// Levels accepted by `--log-level`
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Builds the filter: `RUST_LOG` when set, otherwise `level` for this crate
/// and `warn` for dependencies
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kosh_crawler={},kosh_repair={},warn", level, level)))
}

/// Sets up the tracing subscriber, writing to stderr
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_logging(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .try_init();
}
