use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    location::{DEFAULT_MAX_AGE, DEFAULT_TIMEOUT, LocationRequest},
    model::{Coordinate, Units},
    provider::{DEFAULT_ICON_HOST, openweather::DEFAULT_BASE_URL},
};

/// Environment variable that overrides the API key stored on disk.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Position lookup settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub timeout_ms: u64,
    pub max_age_ms: u64,
    pub high_accuracy: bool,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            max_age_ms: DEFAULT_MAX_AGE.as_millis() as u64,
            high_accuracy: true,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// units = "imperial"
///
/// [fallback]
/// latitude = 40.7128
/// longitude = -74.006
/// ```
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct Config {
    api_key: Option<String>,

    #[serde(default)]
    pub units: Units,

    /// Override for the API root, e.g. a local proxy.
    pub api_base_url: Option<String>,

    pub icon_host: Option<String>,

    /// Used when the location provider cannot produce a fix.
    pub fallback: Option<Coordinate>,

    #[serde(default)]
    pub location: LocationConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("units", &self.units)
            .field("api_base_url", &self.api_base_url)
            .field("icon_host", &self.icon_host)
            .field("fallback", &self.fallback)
            .field("location", &self.location)
            .finish()
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist
    /// yet, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = Self::load_from(&path)?;
        cfg.apply_env_override(std::env::var(API_KEY_ENV).ok());
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "forecast", "forecast-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// A non-empty key from the environment wins over the stored one.
    pub fn apply_env_override(&mut self, env_key: Option<String>) {
        if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key.trim().to_string());
        }
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn icon_host(&self) -> &str {
        self.icon_host.as_deref().unwrap_or(DEFAULT_ICON_HOST)
    }

    pub fn fallback_coordinate(&self) -> Coordinate {
        self.fallback.unwrap_or(Coordinate::FALLBACK)
    }

    pub fn location_request(&self) -> LocationRequest {
        LocationRequest {
            timeout: Duration::from_millis(self.location.timeout_ms),
            max_age: Duration::from_millis(self.location.max_age_ms),
            high_accuracy: self.location.high_accuracy,
        }
    }
}
