use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{
    controller::ViewSettings,
    model::ForecastDays,
    runtime_env::{API_KEY_VAR, DiscoveryPolicy, EnvSource},
};

pub const FALLBACK_CITY: &str = "London";

/// How long to wait for a runtime-injected key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        let policy = DiscoveryPolicy::default();
        Self {
            interval_ms: policy.interval.as_millis() as u64,
            max_attempts: policy.max_attempts,
        }
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Key saved by `citycast configure`. A runtime-injected key takes precedence.
    pub api_key: Option<String>,

    /// City searched when none is given.
    pub default_city: Option<String>,

    /// Forecast entries to show, 4 or 5.
    pub forecast_days: ForecastDays,

    /// Example TOML:
    /// favorites = ["Paris", "Tokyo", "New York"]
    pub favorites: Vec<String>,

    /// `KEY=VALUE` file a container entrypoint writes the key into.
    pub env_file: Option<PathBuf>,

    /// Override for the OpenWeatherMap host.
    pub base_url: Option<String>,

    pub discovery: DiscoveryConfig,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "citycast", "citycast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Store a key; a blank key removes the stored one.
    pub fn set_api_key(&mut self, api_key: String) {
        let api_key = api_key.trim().to_string();
        self.api_key = (!api_key.is_empty()).then_some(api_key);
    }

    pub fn default_city(&self) -> &str {
        self.default_city
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(FALLBACK_CITY)
    }

    pub fn discovery_policy(&self) -> DiscoveryPolicy {
        DiscoveryPolicy {
            interval: Duration::from_millis(self.discovery.interval_ms),
            max_attempts: self.discovery.max_attempts,
        }
    }

    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            forecast_days: self.forecast_days,
            favorites: self
                .favorites
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            ..ViewSettings::default()
        }
    }
}

impl EnvSource for Config {
    fn lookup(&self, name: &str) -> Option<String> {
        if name == API_KEY_VAR {
            self.api_key.clone()
        } else {
            None
        }
    }

    fn describe(&self) -> String {
        "citycast config file".to_string()
    }
}
