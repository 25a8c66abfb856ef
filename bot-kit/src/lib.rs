//! Facade over the bot toolkit crates.
//!
//! Depend on `bot-kit` to get the tool adapter, configuration and logging setup
//! behind feature flags, all enabled by default.

#![warn(missing_docs, clippy::pedantic)]

/// Function-to-tool adapter (enabled by `tools` feature).
#[cfg(feature = "tools")]
pub use bot_tools as tools;

/// `#[tool]` attribute, re-exported for convenience.
#[cfg(feature = "tools")]
pub use bot_tools::tool;

/// Configuration loading (enabled by `config` feature).
#[cfg(feature = "config")]
pub use bot_config as config;

/// Logging setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use bot_telemetry as telemetry;
