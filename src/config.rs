use anyhow::{anyhow, Result};
use config::Config;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::database::{ConnectionSettings, JOURNAL_MODES};

/// Store file used when nothing else is configured, relative to the working directory
pub const DEFAULT_DATABASE_PATH: &str = "scraperwiki.sqlite";

/// Table written to by saves that do not name one
pub const DEFAULT_TABLE: &str = "swdata";

/// Config file picked up from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "scraperwiki.toml";

pub struct ScraperwikiConfig {
    /// Path to the SQLite store file
    pub database_path: String,

    /// Table used by saves without an explicit table name
    pub default_table: String,

    /// SQLite journal mode (default: DELETE)
    pub journal_mode: String,

    /// Busy timeout in milliseconds (default: 5 seconds)
    pub busy_timeout_ms: u64,
}

impl Default for ScraperwikiConfig {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            default_table: DEFAULT_TABLE.to_string(),
            journal_mode: "DELETE".to_string(),
            busy_timeout_ms: 5000,
        }
    }
}

impl ScraperwikiConfig {
    /// Function to create and initialize a new configuration
    ///
    /// Settings come from the given TOML file (or `./scraperwiki.toml` when it
    /// exists), overridden by `SCRAPERWIKI_*` environment variables.
    pub fn new(path: &Option<String>) -> Result<ScraperwikiConfig> {
        let mut builder = Config::builder();

        match path {
            Some(p) => {
                if !Path::new(p.as_str()).exists() {
                    return Err(anyhow!("Config file '{}' does not exist", p));
                }
                builder = builder.add_source(config::File::with_name(p.as_str()));
            }
            None => {
                if Path::new(DEFAULT_CONFIG_FILE).exists() {
                    builder = builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE));
                }
            }
        }

        // E.g., `SCRAPERWIKI_DATABASE_NAME=sqlite:///other.sqlite ./scraper` would switch the store file
        builder = builder.add_source(config::Environment::with_prefix("SCRAPERWIKI"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_map(&config)
    }

    /// Build a configuration from already collected key/value settings
    pub fn from_map(config: &HashMap<String, String>) -> Result<ScraperwikiConfig> {
        let defaults = ScraperwikiConfig::default();

        // `database_name` may carry a SQLAlchemy-style `sqlite:///` URL
        let database_path = config
            .get("database_name")
            .or_else(|| config.get("database_path"))
            .map(|p| p.strip_prefix("sqlite:///").unwrap_or(p).to_string())
            .unwrap_or(defaults.database_path);
        if database_path.is_empty() {
            return Err(anyhow!("Database path must not be empty"));
        }

        let default_table = config
            .get("default_table")
            .cloned()
            .unwrap_or(defaults.default_table);

        let journal_mode = match config.get("journal_mode") {
            Some(mode) => {
                let mode = mode.to_ascii_uppercase();
                if !JOURNAL_MODES.contains(&mode.as_str()) {
                    return Err(anyhow!(
                        "Unknown journal mode '{}'. Valid modes: {}",
                        mode,
                        JOURNAL_MODES.join(", ")
                    ));
                }
                mode
            }
            None => defaults.journal_mode,
        };

        let busy_timeout_ms = match config.get("busy_timeout_ms") {
            Some(ms) => ms
                .parse()
                .map_err(|e| anyhow!("Invalid busy_timeout_ms '{}': {}", ms, e))?,
            None => defaults.busy_timeout_ms,
        };

        Ok(ScraperwikiConfig {
            database_path,
            default_table,
            journal_mode,
            busy_timeout_ms,
        })
    }

    /// Pragmas applied when the store connection is opened
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            journal_mode: self.journal_mode.clone(),
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let lines = [
            format!("Database Path:      {}", self.database_path),
            format!("Default Table:      {}", self.default_table),
            format!("Journal Mode:       {}", self.journal_mode),
            format!("Busy Timeout:       {} ms", self.busy_timeout_ms),
        ];
        lines.join("\n")
    }
}
