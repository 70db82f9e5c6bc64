//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_payload_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_payload_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.operation_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.operation_timeout_ms must be > 0".into(),
            ));
        }
        if !(1..=100).contains(&self.encoding.jpeg_quality) {
            return Err(ConfigError::ValidationError(
                "encoding.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if self.engine.memoize && self.engine.cache_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "engine.cache_capacity must be > 0 when engine.memoize is on".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(
                "logging.format must be \"pretty\" or \"json\"".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.limits.operation_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("operation_timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_jpeg_quality_out_of_range() {
        let mut config = Config::default();
        config.encoding.jpeg_quality = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jpeg_quality"));

        config.encoding.jpeg_quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_cache_capacity_only_matters_when_memoizing() {
        let mut config = Config::default();
        config.engine.cache_capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cache_capacity"));

        config.engine.memoize = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }
}
