//! Configuration validation rules.
//!
//! Applied to `AppConfig` after it has been loaded from environment, files,
//! or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_version`, `user_agent` or `static_segment` is empty
    /// - `origin` is not an http(s) origin
    /// - a resource identifier does not start with `/`
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_bytes` is 0 or exceeds 50MB
    ///
    /// Returns `ConfigError::Missing` if the precache list lacks the shell,
    /// the data file or the worker script.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_version.trim().is_empty() {
            return Err(invalid("cache_version", "must not be empty"));
        }

        if !(self.origin.starts_with("http://") || self.origin.starts_with("https://")) {
            return Err(invalid("origin", "must be an http:// or https:// origin"));
        }

        for (field, value) in [
            ("shell_path", &self.shell_path),
            ("data_file_path", &self.data_file_path),
            ("worker_script", &self.worker_script),
        ] {
            if !value.starts_with('/') {
                return Err(invalid(field, "must start with '/'"));
            }
        }

        if let Some(entry) = self.precache.iter().find(|e| !e.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "precache".into(),
                reason: format!("entry {entry:?} must start with '/'"),
            });
        }

        for (field, value) in [
            ("shell_path", &self.shell_path),
            ("data_file_path", &self.data_file_path),
            ("worker_script", &self.worker_script),
        ] {
            if !self.precache.contains(value) {
                return Err(ConfigError::Missing {
                    field: format!("precache[{value}]"),
                    hint: format!("precache must include {field} so it is available offline"),
                });
            }
        }

        if self.static_segment.is_empty() {
            return Err(invalid("static_segment", "must not be empty"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        let mut seen = std::collections::HashSet::new();
        for entry in &self.precache {
            if !seen.insert(entry) {
                tracing::warn!(entry = %entry, "duplicate precache entry; it will be fetched once per occurrence");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_version() {
        let config = AppConfig { cache_version: "  ".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_version"));
    }

    #[test]
    fn test_validate_origin_scheme() {
        let config = AppConfig { origin: "ftp://example.com".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_relative_precache_entry() {
        let mut config = AppConfig::default();
        config.precache.push("icons/icon.png".into());
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "precache"));
    }

    #[test]
    fn test_validate_precache_missing_shell() {
        let mut config = AppConfig::default();
        config.precache.retain(|e| e != "/index.html");
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field.contains("/index.html")));
    }

    #[test]
    fn test_validate_precache_missing_data_file() {
        let mut config = AppConfig::default();
        config.precache.retain(|e| e != "/phrases.json");
        assert!(matches!(config.validate(), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = AppConfig { timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes_bounds() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));

        let config = AppConfig { max_bytes: 50 * 1024 * 1024, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }
}
