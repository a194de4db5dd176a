use serde::{Deserialize, Serialize};
use zipcast_core::{NetworkError, ReqwestErrorExt, TemperatureUnit};

/// Geographic location resolved from a ZIP code
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Daily forecast entry, temperatures in the forecast's display unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    /// ISO calendar date (`YYYY-MM-DD`) in the location's timezone
    pub date: String,
    pub high: f64,
    pub low: f64,
}

/// Current conditions plus the next few days.
///
/// `from_cache` describes how this particular copy was obtained. It is set
/// when the forecast is handed out, never when it is fetched or stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub current: f64,
    pub today_high: f64,
    pub today_low: f64,
    /// Chronological, today excluded
    pub upcoming: Vec<DayForecast>,
    pub unit: TemperatureUnit,
    pub from_cache: bool,
}

impl Forecast {
    /// A copy of this forecast tagged as served from cache.
    pub fn as_cached(&self) -> Self {
        Self {
            from_cache: true,
            ..self.clone()
        }
    }
}

/// Errors from resolving a ZIP code or fetching its forecast
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("Invalid location: {0}")]
    InvalidLocation(String),
    #[error("Weather service returned HTTP {status}")]
    Upstream { status: u16 },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Invalid endpoint: {0}")]
    Endpoint(String),
}

impl From<reqwest::Error> for ForecastError {
    fn from(e: reqwest::Error) -> Self {
        ForecastError::Network(e.into_network_error())
    }
}

impl ForecastError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidLocation(_) => "ZIP code not found. Check and try again.",
            Self::Upstream { status } if *status >= 500 => {
                "The weather service is experiencing issues. Please try again later."
            }
            Self::Upstream { .. } => "Weather service error. Please try again.",
            Self::MalformedResponse(_) => "Received an unexpected response. Please try again.",
            Self::Network(e) => e.user_message(),
            Self::Endpoint(_) => "Invalid service address. Check your settings.",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network(e) if e.is_timeout())
    }
}
