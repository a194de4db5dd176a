use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    /// Resolves to Fahrenheit: every lookup is a US ZIP code.
    Auto,
    Celsius,
    #[default]
    Fahrenheit,
}

impl TemperatureUnit {
    /// The concrete unit used for display.
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto => Self::Fahrenheit,
            other => other,
        }
    }

    /// Convert a Celsius reading into this unit. No rounding is applied.
    pub fn from_celsius(self, celsius: f64) -> f64 {
        match self.resolve() {
            Self::Celsius => celsius,
            _ => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self.resolve() {
            Self::Celsius => "°C",
            _ => "°F",
        }
    }
}

impl std::str::FromStr for TemperatureUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "c" | "celsius" => Ok(Self::Celsius),
            "f" | "fahrenheit" => Ok(Self::Fahrenheit),
            other => Err(ConfigError::Invalid(format!(
                "unknown temperature unit '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Temperature unit preference
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,

    /// How long a fetched forecast is served from cache
    #[serde(default = "default_cache_minutes")]
    pub cache_minutes: u32,

    /// Connect and read timeout for each upstream request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Number of upcoming days shown after today
    #[serde(default = "default_forecast_days")]
    pub forecast_days: usize,
}

fn default_cache_minutes() -> u32 {
    30
}

fn default_request_timeout_secs() -> u64 {
    8
}

fn default_forecast_days() -> usize {
    3
}

/// Upper bound on upcoming days after today.
pub const MAX_FORECAST_DAYS: usize = 3;

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            temperature_unit: TemperatureUnit::default(),
            cache_minutes: default_cache_minutes(),
            request_timeout_secs: default_request_timeout_secs(),
            forecast_days: default_forecast_days(),
        }
    }
}

impl WeatherConfig {
    pub fn cache_window(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.cache_minutes) * 60)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Base URL of the zippopotam.us style geocoder
    #[serde(default = "default_geocode_base_url")]
    pub geocode_base_url: String,

    /// Base URL of the Open-Meteo forecast API
    #[serde(default = "default_forecast_base_url")]
    pub forecast_base_url: String,
}

pub const DEFAULT_GEOCODE_BASE_URL: &str = "https://api.zippopotam.us";
pub const DEFAULT_FORECAST_BASE_URL: &str = "https://api.open-meteo.com";

fn default_geocode_base_url() -> String {
    DEFAULT_GEOCODE_BASE_URL.to_string()
}

fn default_forecast_base_url() -> String {
    DEFAULT_FORECAST_BASE_URL.to_string()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            geocode_base_url: default_geocode_base_url(),
            forecast_base_url: default_forecast_base_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Weather settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Upstream service locations
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Validate, logging warnings. Fails if there are any errors.
    pub fn ensure_valid(&self) -> Result<ValidationResult> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()))
                .context("Configuration validation failed");
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(validation)
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(
            &self.endpoints.geocode_base_url,
            "endpoints.geocode_base_url",
            &mut result,
        );
        self.validate_url(
            &self.endpoints.forecast_base_url,
            "endpoints.forecast_base_url",
            &mut result,
        );

        if self.weather.cache_minutes == 0 {
            result.add_warning(
                "weather.cache_minutes",
                "Caching disabled (0 minutes), every lookup hits the network",
            );
        } else if self.weather.cache_minutes > 1440 {
            result.add_warning(
                "weather.cache_minutes",
                "Cache window is more than 24 hours",
            );
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        } else if self.weather.request_timeout_secs > 120 {
            result.add_warning(
                "weather.request_timeout_secs",
                "Request timeout is unusually long (>120s)",
            );
        }

        if self.weather.forecast_days > MAX_FORECAST_DAYS {
            result.add_error(
                "weather.forecast_days",
                format!("At most {} upcoming days are shown", MAX_FORECAST_DAYS),
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("platform config directory".into()))
            .context("Failed to get config directory")?
            .join("zipcast");

        Ok(config_dir.join("config.toml"))
    }
}
