use chrono::format::{Item, StrftimeItems};
use chrono::FixedOffset;
use errwatch_api::EndpointKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::refresh::{RefreshConfig, ResponseOrdering};
use crate::time::offset_from_minutes;

/// Main configuration structure
///
/// Loaded from the config file, then env vars and CLI args layered on top.
/// Priority: CLI > Env > File > Defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub refresh: RefreshSettings,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Config {
    /// Load config from the default location, falling back to defaults if there is none
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml(&contents)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        toml::from_str(contents)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save config to the default location, returning where it went
    pub fn save(&self) -> crate::Result<PathBuf> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the config file path
    /// Uses XDG on Linux, Application Support on macOS, AppData on Windows
    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("errwatch");

        Ok(config_dir.join("config.toml"))
    }

    /// Layer `ERRWATCH_*` environment variables over the file values
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("ERRWATCH_BASE_URL") {
            self.source.base_url = url;
        }
        if let Some(key) = non_empty("ERRWATCH_API_KEY") {
            self.source.api_key = Some(key);
        }
    }

    /// Refuse settings that would make the dashboard misbehave
    pub fn validate(&self) -> crate::Result<()> {
        if self.source.base_url.trim().is_empty() {
            return Err(crate::Error::ConfigError("source.base_url must not be empty".into()));
        }
        if self.source.limit == 0 {
            return Err(crate::Error::ConfigError("source.limit must be at least 1".into()));
        }
        if self.refresh.poll_interval_secs == 0 {
            return Err(crate::Error::ConfigError(
                "refresh.poll_interval_secs must be at least 1".into(),
            ));
        }
        if self.display.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(crate::Error::ConfigError(format!(
                "display.utc_offset_minutes out of range: {}",
                self.display.utc_offset_minutes
            )));
        }
        let date_format = &self.display.date_format;
        if date_format.trim().is_empty()
            || StrftimeItems::new(date_format).any(|item| matches!(item, Item::Error))
        {
            return Err(crate::Error::ConfigError(format!(
                "display.date_format is not a valid date format: {:?}",
                date_format
            )));
        }
        Ok(())
    }

    pub fn to_refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            poll_interval: Duration::from_secs(self.refresh.poll_interval_secs),
            min_indicator: Duration::from_millis(self.refresh.min_indicator_ms),
            limit: self.source.limit,
            ordering: self.refresh.ordering,
        }
    }

    /// Offset in which calendar days are taken
    pub fn offset(&self) -> FixedOffset {
        offset_from_minutes(self.display.utc_offset_minutes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    /// Root of the admin proxy or the PostgREST server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub kind: EndpointKind,

    /// Bearer token, also sent as `apikey` for PostgREST
    pub api_key: Option<String>,

    /// Records requested per fetch
    #[serde(default = "default_limit")]
    pub limit: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Extra attempts after a transient failure (network, 5xx, 429)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_limit() -> u32 {
    100
}

fn default_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            kind: EndpointKind::default(),
            api_key: None,
            limit: default_limit(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshSettings {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Minimum time the refreshing indicator stays up after a manual refresh
    #[serde(default = "default_min_indicator")]
    pub min_indicator_ms: u64,

    #[serde(default)]
    pub ordering: ResponseOrdering,
}

fn default_poll_interval() -> u64 {
    30
}

fn default_min_indicator() -> u64 {
    500
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            min_indicator_ms: default_min_indicator(),
            ordering: ResponseOrdering::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    /// Offset from UTC for calendar days, in minutes
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// chrono format string for dates shown to the operator
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            date_format: default_date_format(),
        }
    }
}
