//! Tracing setup for binaries embedding the cache.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;

/// Install the global `tracing` subscriber.
///
/// The filter comes from `level_override` (e.g. a `--log-level` flag) when
/// given, then `RUST_LOG`, then `logging.level`. Calling this again after a
/// subscriber is installed has no effect.
pub fn init_tracing(logging: &LoggingConfig, level_override: Option<&str>) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directive = filter_directive(logging, level_override, rust_log.as_deref());

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new(directive))
        .with(fmt::layer().with_target(false))
        .try_init();
}

fn filter_directive(
    logging: &LoggingConfig,
    level_override: Option<&str>,
    rust_log: Option<&str>,
) -> String {
    [level_override, rust_log]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|d| !d.is_empty())
        .unwrap_or(logging.level.as_str())
        .to_string()
}
