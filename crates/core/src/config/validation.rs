//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - either image cache budget is 0
    /// - `max_image_bytes` is 0 or larger than the cache byte budget
    /// - `default_image_ttl_secs` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.image_cache_max_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "image_cache_max_bytes".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.image_cache_max_entries == 0 {
            return Err(ConfigError::Invalid {
                field: "image_cache_max_entries".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.max_image_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_image_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_image_bytes > self.image_cache_max_bytes {
            return Err(ConfigError::Invalid {
                field: "max_image_bytes".into(),
                reason: "must not exceed image_cache_max_bytes".into(),
            });
        }

        if self.default_image_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "default_image_ttl_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if !self.replace_http_cache {
            tracing::info!("replace_http_cache is off; image requests go straight to the network");
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
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_zero_cache_budget() {
        let config = AppConfig { image_cache_max_entries: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "image_cache_max_entries"));
    }

    #[test]
    fn test_validate_image_larger_than_cache() {
        let config = AppConfig { max_image_bytes: 2048, image_cache_max_bytes: 1024, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_image_bytes"));
    }

    #[test]
    fn test_validate_zero_default_ttl() {
        let config = AppConfig { default_image_ttl_secs: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "default_image_ttl_secs"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { timeout_ms: 100, max_image_bytes: 1, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
