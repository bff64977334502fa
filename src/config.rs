//! Configuration management for `Roadcast`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::RoadcastError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for `Roadcast`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoadcastConfig {
    /// External service endpoints and HTTP settings
    #[serde(default)]
    pub services: ServicesConfig,
    /// Trip sampling and refresh settings
    #[serde(default)]
    pub trip: TripConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// External service configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// OSRM-compatible routing service
    #[serde(default = "default_routing_base_url")]
    pub routing_base_url: String,
    /// Open-Meteo forecast API
    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,
    /// Open-Meteo geocoding API (destination search)
    #[serde(default = "default_geocoding_base_url")]
    pub geocoding_base_url: String,
    /// Nominatim reverse geocoder
    #[serde(default = "default_reverse_geocoding_base_url")]
    pub reverse_geocoding_base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Retries for transient weather and geocoding failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Sent with every request; Nominatim rejects anonymous clients
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Trip sampling and refresh settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripConfig {
    /// Miles between sampled waypoints
    #[serde(default = "default_interval_miles")]
    pub interval_miles: f64,
    /// Divisor applied to the router's duration estimate
    #[serde(default = "default_speed_correction_factor")]
    pub speed_correction_factor: f64,
    /// Period of the auto-refresh timer
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
    /// Delay between consecutive reverse geocoding requests
    #[serde(default = "default_geocode_stagger")]
    pub geocode_stagger_ms: u64,
    /// Days of hourly forecast to request
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long resolved place names are reused
    #[serde(default = "default_place_ttl")]
    pub place_ttl_hours: u32,
    /// Most place names kept before the least recently used is evicted
    #[serde(default = "default_place_capacity")]
    pub place_capacity: usize,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_routing_base_url() -> String {
    "https://router.project-osrm.org".to_string()
}

fn default_weather_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_geocoding_base_url() -> String {
    "https://geocoding-api.open-meteo.com/v1".to_string()
}

fn default_reverse_geocoding_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_timeout() -> u32 {
    15
}

fn default_max_retries() -> u32 {
    2
}

fn default_user_agent() -> String {
    format!("Roadcast/{} (trip weather)", env!("CARGO_PKG_VERSION"))
}

fn default_interval_miles() -> f64 {
    crate::sampler::DEFAULT_INTERVAL_MILES
}

fn default_speed_correction_factor() -> f64 {
    crate::sampler::DEFAULT_SPEED_CORRECTION_FACTOR
}

fn default_refresh_interval() -> u64 {
    300
}

fn default_geocode_stagger() -> u64 {
    1100
}

fn default_forecast_days() -> u32 {
    7
}

fn default_place_ttl() -> u32 {
    24
}

fn default_place_capacity() -> usize {
    2048
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            routing_base_url: default_routing_base_url(),
            weather_base_url: default_weather_base_url(),
            geocoding_base_url: default_geocoding_base_url(),
            reverse_geocoding_base_url: default_reverse_geocoding_base_url(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for TripConfig {
    fn default() -> Self {
        Self {
            interval_miles: default_interval_miles(),
            speed_correction_factor: default_speed_correction_factor(),
            refresh_interval_seconds: default_refresh_interval(),
            geocode_stagger_ms: default_geocode_stagger(),
            forecast_days: default_forecast_days(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            place_ttl_hours: default_place_ttl(),
            place_capacity: default_place_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl TripConfig {
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }

    #[must_use]
    pub fn geocode_stagger(&self) -> Duration {
        Duration::from_millis(self.geocode_stagger_ms)
    }
}

impl ServicesConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl RoadcastConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // ROADCAST_TRIP__INTERVAL_MILES=25 overrides trip.interval_miles
        builder = builder.add_source(
            Environment::with_prefix("ROADCAST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: RoadcastConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("roadcast").join("config.toml"))
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        let services = &mut self.services;
        if services.routing_base_url.is_empty() {
            services.routing_base_url = default_routing_base_url();
        }
        if services.weather_base_url.is_empty() {
            services.weather_base_url = default_weather_base_url();
        }
        if services.geocoding_base_url.is_empty() {
            services.geocoding_base_url = default_geocoding_base_url();
        }
        if services.reverse_geocoding_base_url.is_empty() {
            services.reverse_geocoding_base_url = default_reverse_geocoding_base_url();
        }
        if services.timeout_seconds == 0 {
            services.timeout_seconds = default_timeout();
        }
        if services.user_agent.is_empty() {
            services.user_agent = default_user_agent();
        }
        if self.trip.refresh_interval_seconds == 0 {
            self.trip.refresh_interval_seconds = default_refresh_interval();
        }
        if self.trip.forecast_days == 0 {
            self.trip.forecast_days = default_forecast_days();
        }
        if self.cache.place_ttl_hours == 0 {
            self.cache.place_ttl_hours = default_place_ttl();
        }
        if self.cache.place_capacity == 0 {
            self.cache.place_capacity = default_place_capacity();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if !(self.trip.interval_miles > 0.0 && self.trip.interval_miles <= 500.0) {
            return Err(RoadcastError::config(
                "Waypoint interval must be between 0 and 500 miles",
            )
            .into());
        }

        if !(self.trip.speed_correction_factor > 0.0 && self.trip.speed_correction_factor <= 5.0) {
            return Err(RoadcastError::config(
                "Speed correction factor must be between 0 and 5",
            )
            .into());
        }

        if self.trip.refresh_interval_seconds < 30 {
            return Err(RoadcastError::config(
                "Refresh interval must be at least 30 seconds",
            )
            .into());
        }

        if self.trip.forecast_days > 16 {
            return Err(RoadcastError::config("Forecast days cannot exceed 16").into());
        }

        if self.services.timeout_seconds > 300 {
            return Err(RoadcastError::config(
                "Service timeout cannot exceed 300 seconds",
            )
            .into());
        }

        if self.services.max_retries > 10 {
            return Err(RoadcastError::config("Max retries cannot exceed 10").into());
        }

        if self.cache.place_ttl_hours > 24 * 30 {
            return Err(RoadcastError::config(
                "Place cache TTL cannot exceed 720 hours",
            )
            .into());
        }

        if self.cache.place_capacity > 100_000 {
            return Err(RoadcastError::config(
                "Place cache capacity cannot exceed 100000 entries",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(RoadcastError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(RoadcastError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("routing", &self.services.routing_base_url),
            ("weather", &self.services.weather_base_url),
            ("geocoding", &self.services.geocoding_base_url),
            ("reverse geocoding", &self.services.reverse_geocoding_base_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(RoadcastError::config(format!(
                    "The {name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = RoadcastConfig::default();
        assert_eq!(config.services.weather_base_url, "https://api.open-meteo.com/v1");
        assert_eq!(config.services.routing_base_url, "https://router.project-osrm.org");
        assert_eq!(config.trip.interval_miles, 50.0);
        assert_eq!(config.trip.speed_correction_factor, 1.27);
        assert_eq!(config.trip.refresh_interval(), Duration::from_secs(300));
        assert_eq!(config.logging.level, "info");
        assert!(config.services.user_agent.starts_with("Roadcast/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = RoadcastConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = RoadcastConfig::default();
        config.services.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));

        let mut config = RoadcastConfig::default();
        config.trip.speed_correction_factor = 0.0;
        assert!(config.validate().is_err());

        let mut config = RoadcastConfig::default();
        config.trip.refresh_interval_seconds = 5;
        assert!(config.validate().is_err());

        let mut config = RoadcastConfig::default();
        config.cache.place_capacity = 1_000_000;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("capacity cannot exceed"));
    }

    #[test]
    fn test_config_validation_rejects_bad_url() {
        let mut config = RoadcastConfig::default();
        config.services.reverse_geocoding_base_url = "nominatim.local".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("reverse geocoding base URL"));
    }

    #[test]
    fn test_apply_defaults_fills_empty_values() {
        let mut config = RoadcastConfig::default();
        config.services.weather_base_url.clear();
        config.logging.format.clear();
        config.trip.forecast_days = 0;
        config.cache.place_capacity = 0;
        config.apply_defaults();
        assert_eq!(config.services.weather_base_url, "https://api.open-meteo.com/v1");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.trip.forecast_days, 7);
        assert_eq!(config.cache.place_capacity, 2048);
    }

    #[test]
    fn test_load_partial_file() {
        let path = std::env::temp_dir().join(format!("roadcast-config-{}.toml", std::process::id()));
        fs::write(
            &path,
            "[trip]\ninterval_miles = 25.0\n\n[logging]\nformat = \"json\"\n",
        )
        .unwrap();

        let config = RoadcastConfig::load_from_path(Some(path.clone())).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.trip.interval_miles, 25.0);
        assert_eq!(config.trip.speed_correction_factor, 1.27);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.services.max_retries, 2);
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = RoadcastConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("roadcast"));
            assert!(path.to_string_lossy().ends_with("config.toml"));
        }
    }
}
