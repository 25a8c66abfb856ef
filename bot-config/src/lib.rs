//! Configuration for bot toolkits.
//!
//! Settings come from an optional JSON file and are then overridden by
//! `BOT_*` environment variables. Every field has a default, so an empty file
//! or no file at all yields a usable configuration.

#![warn(missing_docs, clippy::pedantic)]

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable overriding [`LogConfig::filter`].
pub const ENV_LOG_FILTER: &str = "BOT_LOG_FILTER";
/// Environment variable overriding [`ToolIdentity::name`].
pub const ENV_TOOL_NAME: &str = "BOT_TOOL_NAME";
/// Environment variable overriding [`ToolIdentity::description`].
pub const ENV_TOOL_DESCRIPTION: &str = "BOT_TOOL_DESCRIPTION";

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolkitConfig {
    /// Logging setup.
    pub log: LogConfig,
    /// Name and description of the exposed tool.
    pub tool: ToolIdentity,
}

/// Logging setup consumed by the telemetry crate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `EnvFilter` directives, e.g. `info,bot_tools=debug`.
    pub filter: String,
    /// Emit ANSI colours.
    pub ansi: bool,
    /// Include the event target in each line.
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            ansi: true,
            with_target: false,
        }
    }
}

/// Name and description under which a tool bunch is advertised.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolIdentity {
    /// Tool name shown to the model.
    pub name: String,
    /// Human-facing description.
    pub description: String,
}

impl Default for ToolIdentity {
    fn default() -> Self {
        Self {
            name: "tools".to_owned(),
            description: "Bunch of functions callable through op=list|help|call".to_owned(),
        }
    }
}

impl ToolkitConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON or contains unknown
    /// fields.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid toolkit configuration")
    }

    /// Reads `path`, or starts from defaults when `path` is `None`, then
    /// applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                Self::from_json(&text)
                    .with_context(|| format!("failed to parse config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides looked up through `lookup`. Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let targets = [
            (ENV_LOG_FILTER, &mut self.log.filter),
            (ENV_TOOL_NAME, &mut self.tool.name),
            (ENV_TOOL_DESCRIPTION, &mut self.tool.description),
        ];
        for (key, field) in targets {
            if let Some(value) = lookup(key).filter(|value| !value.trim().is_empty()) {
                debug!(key, "applying configuration override");
                *field = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ToolkitConfig::from_json("{}").expect("parse");
        assert_eq!(config, ToolkitConfig::default());
        assert_eq!(config.log.filter, "info");
        assert_eq!(config.tool.name, "tools");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config =
            ToolkitConfig::from_json(r#"{"log": {"with_target": true}, "tool": {"name": "math"}}"#)
                .expect("parse");
        assert!(config.log.with_target);
        assert!(config.log.ansi);
        assert_eq!(config.tool.name, "math");
        assert_eq!(config.tool.description, ToolIdentity::default().description);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = ToolkitConfig::from_json(r#"{"log": {"level": "debug"}}"#).expect_err("unknown");
        assert!(format!("{err:#}").contains("level"));
    }

    #[test]
    fn environment_overrides_win_unless_blank() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_LOG_FILTER, "debug,bot_tools=trace"),
            (ENV_TOOL_NAME, "  "),
            (ENV_TOOL_DESCRIPTION, "Math helpers"),
        ]);
        let mut config = ToolkitConfig::default();
        config.apply_overrides(|key| env.get(key).map(|value| (*value).to_owned()));

        assert_eq!(config.log.filter, "debug,bot_tools=trace");
        assert_eq!(config.tool.name, "tools");
        assert_eq!(config.tool.description, "Math helpers");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ToolkitConfig::load(Some(Path::new("/nonexistent/bot.json"))).expect_err("missing");
        assert!(err.to_string().contains("/nonexistent/bot.json"));
    }
}
