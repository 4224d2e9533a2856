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
    /// Returns `ConfigError::Invalid` if:
    /// - `number_width` is 0 or exceeds 9 digits
    /// - a cache TTL is not positive
    /// - `utc_offset_minutes` is outside ±14 hours
    /// - meal hour boundaries are not strictly increasing or exceed 24
    /// - `public_base_url` or `render_endpoint` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.number_width == 0 || self.number_width > 9 {
            return Err(ConfigError::Invalid {
                field: "number_width".into(),
                reason: "must be between 1 and 9 digits".into(),
            });
        }

        if self.list_ttl_secs <= 0 {
            return Err(ConfigError::Invalid { field: "list_ttl_secs".into(), reason: "must be positive".into() });
        }
        if self.live_ttl_secs <= 0 {
            return Err(ConfigError::Invalid { field: "live_ttl_secs".into(), reason: "must be positive".into() });
        }

        if self.utc_offset_minutes.abs() > 14 * 60 {
            return Err(ConfigError::Invalid {
                field: "utc_offset_minutes".into(),
                reason: "must be within +/-14 hours of UTC".into(),
            });
        }

        let hours = &self.meal_hours;
        if hours.breakfast_start >= hours.lunch_start
            || hours.lunch_start >= hours.dinner_start
            || hours.dinner_start >= hours.dinner_end
        {
            return Err(ConfigError::Invalid {
                field: "meal_hours".into(),
                reason: "boundaries must be strictly increasing".into(),
            });
        }
        if hours.dinner_end > 24 {
            return Err(ConfigError::Invalid {
                field: "meal_hours".into(),
                reason: "dinner_end must not exceed 24".into(),
            });
        }

        if self.public_base_url.is_empty() {
            return Err(ConfigError::Invalid { field: "public_base_url".into(), reason: "must not be empty".into() });
        }
        if self.render_endpoint.is_empty() {
            return Err(ConfigError::Invalid { field: "render_endpoint".into(), reason: "must not be empty".into() });
        }

        Ok(())
    }
}
