//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BACKPLANE_*)
//! 2. TOML config file (if BACKPLANE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BACKPLANE_*)
/// 2. TOML config file (if BACKPLANE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite document store.
    ///
    /// Set via BACKPLANE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory holding cached player scripts.
    #[serde(default = "default_player_cache_dir")]
    pub player_cache_dir: PathBuf,

    /// Screenshot folder used when the `screenshotFolderPath` setting is empty.
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,

    /// User-Agent string for upstream image requests.
    ///
    /// Set via BACKPLANE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream request timeout in milliseconds.
    ///
    /// Set via BACKPLANE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Largest single upstream image accepted, in bytes.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    /// Whether image requests are redirected through the in-memory cache.
    ///
    /// Set via BACKPLANE_REPLACE_HTTP_CACHE environment variable.
    #[serde(default = "default_true")]
    pub replace_http_cache: bool,

    /// Byte budget of the image cache.
    #[serde(default = "default_image_cache_max_bytes")]
    pub image_cache_max_bytes: usize,

    /// Entry budget of the image cache.
    #[serde(default = "default_image_cache_max_entries")]
    pub image_cache_max_entries: usize,

    /// Lifetime given to images whose response carries no freshness headers.
    #[serde(default = "default_image_ttl_secs")]
    pub default_image_ttl_secs: u64,

    /// Trust the development server instead of the packaged bundle.
    ///
    /// Set via BACKPLANE_DEV_MODE environment variable.
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./backplane.sqlite")
}

fn default_player_cache_dir() -> PathBuf {
    PathBuf::from("./player_cache")
}

fn default_screenshot_dir() -> PathBuf {
    PathBuf::from("./screenshots")
}

fn default_user_agent() -> String {
    "backplane/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_image_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_image_cache_max_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_image_cache_max_entries() -> usize {
    4096
}

fn default_image_ttl_secs() -> u64 {
    60 * 60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            player_cache_dir: default_player_cache_dir(),
            screenshot_dir: default_screenshot_dir(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_image_bytes: default_max_image_bytes(),
            replace_http_cache: true,
            image_cache_max_bytes: default_image_cache_max_bytes(),
            image_cache_max_entries: default_image_cache_max_entries(),
            default_image_ttl_secs: default_image_ttl_secs(),
            dev_mode: false,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Fallback image lifetime as Duration.
    pub fn default_image_ttl(&self) -> Duration {
        Duration::from_secs(self.default_image_ttl_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BACKPLANE_`
    /// 2. TOML file from `BACKPLANE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("BACKPLANE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("BACKPLANE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
