//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/campusmeet/config.toml` by default:
//!
//! ```toml
//! [snapshot]
//! path = "/srv/campusmeet/snapshot.json"
//!
//! [expand]
//! default_window_days = 90
//! max_window_days = 3660
//! count_policy = "candidates"
//!
//! [output]
//! json = false
//! date_format = "%a %Y-%m-%d"
//! ```

use std::path::{Path, PathBuf};

use campusmeet_core::CountPolicy;
use campusmeet_service::{DEFAULT_MAX_WINDOW_DAYS, ServiceConfig};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Configuration for the campusmeet client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Snapshot location.
    pub snapshot: SnapshotSettings,

    /// Expansion settings.
    pub expand: ExpandSettings,

    /// Output settings.
    pub output: OutputSettings,
}

/// Where to find the store snapshot when `--snapshot` is not given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Expansion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandSettings {
    /// Window length used when a window is needed and `--to` is missing.
    pub default_window_days: u32,

    /// Longest window an expansion may cover.
    pub max_window_days: u32,

    /// Whether exception dates consume a rule's count.
    pub count_policy: CountPolicy,
}

impl Default for ExpandSettings {
    fn default() -> Self {
        Self {
            default_window_days: 90,
            max_window_days: DEFAULT_MAX_WINDOW_DAYS,
            count_policy: CountPolicy::default(),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Print JSON instead of a table.
    pub json: bool,

    /// strftime format for occurrence dates.
    pub date_format: String,

    /// strftime format for start and end times.
    pub time_format: String,

    /// Text to show when an expansion yields nothing.
    pub no_occurrence_text: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            json: false,
            date_format: "%a %Y-%m-%d".to_string(),
            time_format: "%H:%M".to_string(),
            no_occurrence_text: "No occurrences".to_string(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path, or returns defaults if the
    /// file does not exist.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads and validates configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> ClientResult<Self> {
        toml::from_str(content).map_err(|e| ClientError::config(format!("failed to parse config: {e}")))
    }

    /// Serializes the configuration to TOML.
    pub fn to_toml(&self) -> ClientResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ClientError::config(format!("failed to serialize config: {e}")))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("campusmeet")
    }

    /// Checks every setting.
    pub fn validate(&self) -> ClientResult<()> {
        self.service_config()?;
        if self.expand.default_window_days == 0 {
            return Err(ClientError::config("expand.default_window_days must be at least 1"));
        }
        if self.expand.default_window_days > self.expand.max_window_days {
            return Err(ClientError::config(format!(
                "expand.default_window_days ({}) exceeds expand.max_window_days ({})",
                self.expand.default_window_days, self.expand.max_window_days
            )));
        }
        check_format("output.date_format", &self.output.date_format)?;
        check_format("output.time_format", &self.output.time_format)?;
        Ok(())
    }

    /// Service configuration derived from the `[expand]` section.
    pub fn service_config(&self) -> ClientResult<ServiceConfig> {
        let config = ServiceConfig::new()
            .with_max_window_days(self.expand.max_window_days)
            .with_count_policy(self.expand.count_policy);
        config.validate()?;
        Ok(config)
    }
}

fn check_format(name: &str, format: &str) -> ClientResult<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ClientError::config(format!("{name} is not a valid format: {format:?}")));
    }
    Ok(())
}
