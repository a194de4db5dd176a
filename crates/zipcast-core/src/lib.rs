pub mod config;
pub mod error;

pub use config::{
    Config, EndpointsConfig, TemperatureUnit, ValidationResult, WeatherConfig,
    DEFAULT_FORECAST_BASE_URL, DEFAULT_GEOCODE_BASE_URL, MAX_FORECAST_DAYS,
};
pub use error::{ConfigError, NetworkError, ReqwestErrorExt};

use anyhow::Result;

/// Initialize logging for the application.
///
/// Honors `RUST_LOG`, falling back to `info`. Output goes to stderr so that
/// rendered forecasts on stdout stay clean.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!("zipcast core initialized");
    Ok(())
}
