//! Logging setup for bot toolkits.
//!
//! Installs a `tracing-subscriber` formatter driven by [`LogConfig`]. The
//! `RUST_LOG` environment variable, when set, takes precedence over the
//! configured filter.

#![warn(missing_docs, clippy::pedantic)]

use anyhow::{Context, Result, anyhow};
use bot_config::LogConfig;
use tracing_subscriber::EnvFilter;

/// Builds the event filter: `RUST_LOG` first, then `config.filter`.
///
/// # Errors
///
/// Returns an error if the configured directives do not parse.
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter)
            .with_context(|| format!("invalid log filter `{}`", config.filter)),
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a global subscriber is
/// already installed.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let filter = build_filter(config)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_ansi(config.ansi)
        .with_level(true)
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;
    tracing::debug!(filter = %config.filter, "tracing initialised");
    Ok(())
}
