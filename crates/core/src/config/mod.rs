//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (MEALPASS_*)
//! 2. TOML config file (if MEALPASS_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::mealtime::MealHours;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (MEALPASS_*)
/// 2. TOML config file (if MEALPASS_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite record store.
    ///
    /// Set via MEALPASS_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Root directory for stored QR code images.
    ///
    /// Set via MEALPASS_BLOB_ROOT environment variable.
    #[serde(default = "default_blob_root")]
    pub blob_root: PathBuf,

    /// Public base URL embedded in generated QR payloads
    /// (`<public_base_url>/api/v1/redirect/<number>`).
    ///
    /// Set via MEALPASS_PUBLIC_BASE_URL environment variable.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Fallback live-event URL when none has been configured.
    ///
    /// Set via MEALPASS_DEFAULT_LIVE_URL environment variable.
    #[serde(default)]
    pub default_live_url: Option<String>,

    /// Single system timezone as minutes east of UTC. All meal-window and
    /// day-rollover math uses this, never the server's own timezone.
    ///
    /// Set via MEALPASS_UTC_OFFSET_MINUTES environment variable.
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Meal-window hour boundaries (local hours).
    #[serde(default)]
    pub meal_hours: MealHours,

    /// Zero-padded width of assigned QR numbers.
    ///
    /// Set via MEALPASS_NUMBER_WIDTH environment variable.
    #[serde(default = "default_number_width")]
    pub number_width: usize,

    /// TTL in seconds for the cached full QR list.
    ///
    /// Set via MEALPASS_LIST_TTL_SECS environment variable.
    #[serde(default = "default_shared_ttl")]
    pub list_ttl_secs: i64,

    /// TTL in seconds for the cached live URL.
    ///
    /// Set via MEALPASS_LIVE_TTL_SECS environment variable.
    #[serde(default = "default_shared_ttl")]
    pub live_ttl_secs: i64,

    /// External QR render endpoint. The payload string is passed as the
    /// `data` query parameter and the response body is the image bytes.
    ///
    /// Set via MEALPASS_RENDER_ENDPOINT environment variable.
    #[serde(default = "default_render_endpoint")]
    pub render_endpoint: String,

    /// Render request timeout in milliseconds.
    ///
    /// Set via MEALPASS_RENDER_TIMEOUT_MS environment variable.
    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    /// Bearer token accepted by the admin credential adapter. Admin routes
    /// are disabled when unset.
    ///
    /// Set via MEALPASS_ADMIN_TOKEN environment variable.
    #[serde(default)]
    pub admin_token: Option<String>,

    /// HTTP listen port.
    ///
    /// Set via MEALPASS_PORT environment variable.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./mealpass.sqlite")
}

fn default_blob_root() -> PathBuf {
    PathBuf::from("./blobs")
}

fn default_public_base_url() -> String {
    "http://localhost:8080".into()
}

fn default_number_width() -> usize {
    3
}

fn default_shared_ttl() -> i64 {
    300
}

fn default_render_endpoint() -> String {
    "https://api.qrserver.com/v1/create-qr-code/".into()
}

fn default_render_timeout_ms() -> u64 {
    10_000
}

fn default_port() -> u16 {
    8080
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            blob_root: default_blob_root(),
            public_base_url: default_public_base_url(),
            default_live_url: None,
            utc_offset_minutes: 0,
            meal_hours: MealHours::default(),
            number_width: default_number_width(),
            list_ttl_secs: default_shared_ttl(),
            live_ttl_secs: default_shared_ttl(),
            render_endpoint: default_render_endpoint(),
            render_timeout_ms: default_render_timeout_ms(),
            admin_token: None,
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Render timeout as a Duration for use with reqwest.
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
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

        if let Ok(config_path) = std::env::var("MEALPASS_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("MEALPASS_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check that an admin token is configured (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no admin token is set.
    pub fn require_admin_token(&self) -> Result<&str, ConfigError> {
        self.admin_token.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "admin_token".into(),
            hint: "Set MEALPASS_ADMIN_TOKEN environment variable".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./mealpass.sqlite"));
        assert_eq!(config.public_base_url, "http://localhost:8080");
        assert_eq!(config.number_width, 3);
        assert_eq!(config.list_ttl_secs, 300);
        assert_eq!(config.live_ttl_secs, 300);
        assert_eq!(config.utc_offset_minutes, 0);
        assert_eq!(config.meal_hours, MealHours::default());
        assert!(config.default_live_url.is_none());
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_render_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.render_timeout(), Duration::from_millis(10_000));
    }

    #[test]
    fn test_require_admin_token_missing() {
        let config = AppConfig::default();
        let result = config.require_admin_token();
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_require_admin_token_present() {
        let config = AppConfig { admin_token: Some("sekrit".into()), ..Default::default() };
        assert_eq!(config.require_admin_token().unwrap(), "sekrit");
    }
}
