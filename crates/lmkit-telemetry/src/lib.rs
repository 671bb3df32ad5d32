//! Logging setup for lmkit binaries
//!
//! Installs a `tracing-subscriber` writing to stderr so that stdout stays
//! free for results.

use lmkit_config::TelemetryConfig;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging from configuration
///
/// The filter comes from `RUST_LOG` when set, then the configured
/// `log_filter`, then `default_filter`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(config: Option<&TelemetryConfig>, default_filter: &str) -> anyhow::Result<()> {
    let filter = resolve_filter(config, default_filter);
    let json = config.is_some_and(|c| c.json);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt_layer.json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;
    } else {
        registry
            .with(fmt_layer)
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;
    }

    Ok(())
}

fn resolve_filter(config: Option<&TelemetryConfig>, default_filter: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let directive = config
        .and_then(|c| c.log_filter.as_deref())
        .unwrap_or(default_filter);
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}
