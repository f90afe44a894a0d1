//! Configuration file handling.
//!
//! Configuration is read from a TOML file. Every field has a default, so a
//! missing file or a partial file is fine.
//!
//! # Configuration Location
//!
//! - Linux: `~/.config/breachrisk/config.toml`
//! - macOS: `~/Library/Application Support/breachrisk/config.toml`
//! - Windows: `%APPDATA%\breachrisk\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! source = "remote"
//! policy = "canonical"
//! default_format = "table"
//! save_scans = true
//!
//! [remote]
//! base_url = "https://haveibeenpwned.com/api/v3"
//! api_key = "..."
//! rate_limit_ms = 1600
//!
//! [offline]
//! dataset_path = "/srv/breaches.json"
//! ```
//!
//! # Environment
//!
//! `BREACHRISK_API_KEY` and `BREACHRISK_BASE_URL` override the `[remote]`
//! values from the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::platform;
use crate::risk::ScoringPolicy;
use crate::source::{
    SourceKind, DEFAULT_API_KEY_HEADER, DEFAULT_BASE_URL, DEFAULT_RATE_LIMIT_MS,
    DEFAULT_TIMEOUT_SECS,
};

pub const API_KEY_ENV: &str = "BREACHRISK_API_KEY";
pub const BASE_URL_ENV: &str = "BREACHRISK_BASE_URL";

/// Application configuration.
///
/// ```no_run
/// use breachrisk::Config;
///
/// let config = Config::load().unwrap();
/// println!("source: {}", config.source);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Breach source used when no `--source` flag is given.
    pub source: SourceKind,

    /// Scoring policy used when no `--policy` flag is given.
    pub policy: ScoringPolicy,

    /// Valid values: "table", "json"
    pub default_format: String,

    /// Whether the CLI persists scans and profile snapshots.
    pub save_scans: bool,

    pub remote: RemoteConfig,
    pub offline: OfflineConfig,
    pub local: LocalConfig,
}

/// Settings for the breach API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key_header: String,

    /// Without a key the remote source falls back to the offline dataset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Delay after every network call, in milliseconds.
    pub rate_limit_ms: u64,
    pub timeout_secs: u64,
    pub cache_ttl_hours: u64,
    pub use_cache: bool,
}

impl RemoteConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            api_key: None,
            rate_limit_ms: DEFAULT_RATE_LIMIT_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache_ttl_hours: 24,
            use_cache: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    /// JSON dataset to load instead of the bundled one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Email table to load instead of the bundled one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            policy: ScoringPolicy::default(),
            default_format: "table".to_string(),
            save_scans: true,
            remote: RemoteConfig::default(),
            offline: OfflineConfig::default(),
            local: LocalConfig::default(),
        }
    }
}

impl Config {
    /// Loads the config file, or defaults if it doesn't exist, then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_overrides(
            std::env::var(API_KEY_ENV).ok(),
            std::env::var(BASE_URL_ENV).ok(),
        );
        Ok(config)
    }

    /// Loads a specific file without environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Replaces remote settings with non-blank override values.
    pub fn apply_overrides(&mut self, api_key: Option<String>, base_url: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.remote.api_key = Some(key);
        }
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.remote.base_url = url;
        }
    }

    /// Saves to [`Config::config_path`], creating the directory if needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::config_path())
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// The default configuration rendered as TOML.
    pub fn generate_default_config() -> String {
        toml::to_string_pretty(&Config::default()).unwrap_or_default()
    }
}
