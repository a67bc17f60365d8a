//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The cache version is read once at load time and never mutated; changing
//! it on every deploy is what forces a clean cache generation.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name of the current cache generation.
    ///
    /// Set via SWCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin that relative resource identifiers resolve against.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Resources fetched into the current generation on install, in order.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// The app shell served for navigations.
    #[serde(default = "default_shell_path")]
    pub shell_path: String,

    /// Offline data file; cache-first requests fall back to it.
    #[serde(default = "default_data_file_path")]
    pub data_file_path: String,

    /// The worker's own registration script.
    #[serde(default = "default_worker_script")]
    pub worker_script: String,

    /// Path segment marking cache-first static assets.
    #[serde(default = "default_static_segment")]
    pub static_segment: String,

    /// Path to the SQLite cache database used by the host binary.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network fetches.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network fetch timeout in milliseconds.
    ///
    /// Set via SWCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes accepted per network response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Synthesize an offline response when both cache and network fail
    /// (app-shell and cache-first requests only).
    #[serde(default = "default_true")]
    pub offline_fallback: bool,
}

fn default_cache_version() -> String {
    "mh-v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_precache() -> Vec<String> {
    ["/", "/index.html", "/manifest.webmanifest", "/phrases.json", "/sw.js"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_shell_path() -> String {
    "/index.html".into()
}

fn default_data_file_path() -> String {
    "/phrases.json".into()
}

fn default_worker_script() -> String {
    "/sw.js".into()
}

fn default_static_segment() -> String {
    "/static/".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_version: default_cache_version(),
            origin: default_origin(),
            precache: default_precache(),
            shell_path: default_shell_path(),
            data_file_path: default_data_file_path(),
            worker_script: default_worker_script(),
            static_segment: default_static_segment(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            offline_fallback: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache_version, "mh-v1");
        assert_eq!(config.origin, "http://localhost:8080");
        assert_eq!(config.shell_path, "/index.html");
        assert_eq!(config.data_file_path, "/phrases.json");
        assert_eq!(config.static_segment, "/static/");
        assert_eq!(config.db_path, PathBuf::from("./swcache.sqlite"));
        assert_eq!(config.timeout_ms, 20_000);
        assert!(config.offline_fallback);
        assert_eq!(config.precache.len(), 5);
        assert!(config.precache.contains(&"/sw.js".to_string()));
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_toml_layer_overrides_defaults() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string("cache_version = \"mh-v2\"\noffline_fallback = false"));
        let config = AppConfig::extract(figment).unwrap();
        assert_eq!(config.cache_version, "mh-v2");
        assert!(!config.offline_fallback);
        assert_eq!(config.shell_path, "/index.html");
    }

    #[test]
    fn test_extract_runs_validation() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string("cache_version = \"\""));
        let result = AppConfig::extract(figment);
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_version"));
    }
}
