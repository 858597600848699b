//! Logging setup

use tracing_subscriber::EnvFilter;

/// Environment variable checked before `RUST_LOG`
pub const LOG_ENV: &str = "LBX_LOG";

/// Install the global `tracing` subscriber.
///
/// Logs go to stderr since stdout may carry the expanded program. The filter comes
/// from `LBX_LOG`, then `RUST_LOG`, then `default_filter`.
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
