//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/namesync/config.toml)
//! 3. Environment variables (NAMESYNC_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::models::SortMode;

/// Environment variable prefix
const ENV_PREFIX: &str = "NAMESYNC";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base address of the REST endpoints
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Live snapshot socket address (empty disables live updates)
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How long to wait for a pushed snapshot after a submission before
    /// asking for the list directly (0 disables)
    #[serde(default = "default_snapshot_fallback_ms")]
    pub snapshot_fallback_ms: u64,

    /// Initial sort mode of the list
    #[serde(default)]
    pub default_sort: SortMode,

    /// TUI debug log file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ws_url: default_ws_url(),
            request_timeout_secs: default_request_timeout_secs(),
            snapshot_fallback_ms: default_snapshot_fallback_ms(),
            default_sort: SortMode::default(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (NAMESYNC_API_URL, NAMESYNC_WS_URL, ...)
    /// 2. Config file (~/.config/namesync/config.toml or NAMESYNC_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // NAMESYNC_API_URL
        if let Ok(val) = std::env::var(format!("{}_API_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.api_url = val;
            }
        }

        // NAMESYNC_WS_URL
        if let Ok(val) = std::env::var(format!("{}_WS_URL", ENV_PREFIX)) {
            self.ws_url = val;
        }

        // NAMESYNC_REQUEST_TIMEOUT
        if let Ok(val) = std::env::var(format!("{}_REQUEST_TIMEOUT", ENV_PREFIX)) {
            match val.parse() {
                Ok(0) => warn!("Ignoring {}_REQUEST_TIMEOUT=0", ENV_PREFIX),
                Ok(secs) => self.request_timeout_secs = secs,
                Err(_) => {}
            }
        }

        // NAMESYNC_SNAPSHOT_FALLBACK_MS
        if let Ok(val) = std::env::var(format!("{}_SNAPSHOT_FALLBACK_MS", ENV_PREFIX)) {
            if let Ok(ms) = val.parse() {
                self.snapshot_fallback_ms = ms;
            }
        }
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with NAMESYNC_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("namesync")
            .join("config.toml")
    }

    /// Live snapshot socket address, `None` when live updates are disabled
    pub fn live_url(&self) -> Option<&str> {
        let url = self.ws_url.trim();
        (!url.is_empty()).then_some(url)
    }

    /// Per-request timeout; a zero setting falls back to the default
    pub fn request_timeout(&self) -> Duration {
        match self.request_timeout_secs {
            0 => Duration::from_secs(default_request_timeout_secs()),
            secs => Duration::from_secs(secs),
        }
    }

    /// Delay before the fallback list request, `None` when disabled
    pub fn snapshot_fallback(&self) -> Option<Duration> {
        (self.snapshot_fallback_ms > 0).then(|| Duration::from_millis(self.snapshot_fallback_ms))
    }

    /// Where the TUI writes its debug log
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("namesync-debug.log"))
    }
}

fn default_api_url() -> String {
    "http://localhost:3300/api".to_string()
}

fn default_ws_url() -> String {
    "ws://localhost:3300/ws".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_snapshot_fallback_ms() -> u64 {
    1500
}
