//! Optional TOML configuration for the `blackout-gate` CLI.
//!
//! ```toml
//! calendar = "/etc/blackout-gate/freeze.ics"
//! margin_seconds = 1800
//! selection = "first-found"
//!
//! [logging]
//! level = "info"
//! json = true
//! ```
//!
//! Command-line flags override every value here.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blackout_gate::{Selection, DEFAULT_ADVANCE_MARGIN_SECONDS};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Calendar file read when no `--input` is given.
    pub calendar: Option<PathBuf>,
    pub margin_seconds: i64,
    pub selection: Selection,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calendar: None,
            margin_seconds: DEFAULT_ADVANCE_MARGIN_SECONDS,
            selection: Selection::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
