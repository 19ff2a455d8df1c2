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

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if:
    /// - `storage_bucket` is unset or blank
    /// - `domain_whitelist` has no usable entry
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `render_timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_concurrent_renders` is 0
    /// - either viewport dimension is 0
    /// - `download_filename` is empty or contains a quote or line break
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.require_storage_bucket()?;

        if self.whitelist().is_empty() {
            return Err(ConfigError::Missing {
                field: "domain_whitelist".into(),
                hint: "Set PDFSNAP_DOMAIN_WHITELIST (or DOMAIN_WHITELIST) to a comma-separated list of domains"
                    .into(),
            });
        }

        if self.render_timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "render_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.render_timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "render_timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.max_concurrent_renders == 0 {
            return Err(ConfigError::Invalid {
                field: "max_concurrent_renders".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(ConfigError::Invalid { field: "viewport".into(), reason: "dimensions must be non-zero".into() });
        }

        if self.download_filename.is_empty() {
            return Err(ConfigError::Invalid { field: "download_filename".into(), reason: "must not be empty".into() });
        }
        if self.download_filename.contains(['"', '\r', '\n']) {
            return Err(ConfigError::Invalid {
                field: "download_filename".into(),
                reason: "must not contain quotes or line breaks".into(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        AppConfig {
            storage_bucket: Some("exports".into()),
            domain_whitelist: vec!["example.com".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_minimal_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_default_config_is_incomplete() {
        let result = AppConfig::default().validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "storage_bucket"));
    }

    #[test]
    fn test_validate_whitelist_of_only_blank_entries() {
        let config = AppConfig { domain_whitelist: vec![" ".into(), ".".into()], ..valid() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "domain_whitelist"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { render_timeout_ms: 50, ..valid() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "render_timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { render_timeout_ms: 301_000, ..valid() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "render_timeout_ms"));
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let config = AppConfig { max_concurrent_renders: 0, ..valid() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_concurrent_renders"));
    }

    #[test]
    fn test_validate_zero_viewport() {
        let config = AppConfig { viewport_height: 0, ..valid() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "viewport"));
    }

    #[test]
    fn test_validate_filename_with_quote() {
        let config = AppConfig { download_filename: "a\"b.pdf".into(), ..valid() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "download_filename"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { render_timeout_ms: 100, max_concurrent_renders: 1, ..valid() };
        assert!(config.validate().is_ok());

        let config = AppConfig { render_timeout_ms: 300_000, ..valid() };
        assert!(config.validate().is_ok());
    }
}
