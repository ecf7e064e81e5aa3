//! Logging bootstrap for hosts that do not install their own subscriber.

use crate::config::Config;
use anyhow::anyhow;

/// Installs a global `tracing` subscriber honouring the configured level.
///
/// Fails if a global subscriber is already installed; hosts that configure
/// their own can ignore the error.
pub fn init(config: &Config) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))
}
