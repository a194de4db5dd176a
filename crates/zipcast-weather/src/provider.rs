//! Open-Meteo forecast client.

use crate::types::{Coordinates, DayForecast, Forecast, ForecastError};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use zipcast_core::{TemperatureUnit, MAX_FORECAST_DAYS};

const USER_AGENT: &str = concat!("zipcast/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by the geocoder and the forecast provider.
///
/// `timeout` is applied separately to connecting and to each read from the
/// connection.
pub fn build_client(timeout: Duration) -> Result<Client, ForecastError> {
    Ok(Client::builder()
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    current_weather: OpenMeteoCurrent,
    daily: OpenMeteoDaily,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoCurrent {
    temperature: f64,
}

/// Parallel arrays indexed by day offset from today. Open-Meteo reports
/// missing model values as `null`.
#[derive(Debug, Deserialize)]
struct OpenMeteoDaily {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
}

/// Fetches current temperature and daily highs/lows for a coordinate pair.
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: Url,
    unit: TemperatureUnit,
    upcoming_days: usize,
}

impl WeatherProvider {
    pub fn new(
        client: Arc<Client>,
        base_url: &str,
        unit: TemperatureUnit,
    ) -> Result<Self, ForecastError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ForecastError::Endpoint(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ForecastError::Endpoint(base_url.to_string()));
        }

        Ok(Self {
            client,
            base_url,
            unit,
            upcoming_days: MAX_FORECAST_DAYS,
        })
    }

    /// Number of days after today to include, when the upstream has them.
    /// Never more than [`MAX_FORECAST_DAYS`].
    pub fn with_upcoming_days(mut self, days: usize) -> Self {
        self.upcoming_days = days.min(MAX_FORECAST_DAYS);
        self
    }

    fn forecast_url(&self, coords: &Coordinates) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["v1", "forecast"]);
        }
        url.query_pairs_mut()
            .append_pair("latitude", &coords.latitude.to_string())
            .append_pair("longitude", &coords.longitude.to_string())
            .append_pair("current_weather", "true")
            .append_pair("daily", "temperature_2m_max,temperature_2m_min")
            .append_pair("timezone", "auto");
        url
    }

    /// Fetch the forecast at `coords`. The result always has `from_cache = false`.
    pub async fn fetch(&self, coords: &Coordinates) -> Result<Forecast, ForecastError> {
        let url = self.forecast_url(coords);

        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::debug!("Forecast request failed: {}", e);
            ForecastError::from(e)
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!("Forecast API returned status {}", status);
            return Err(ForecastError::Upstream {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: OpenMeteoResponse = serde_json::from_str(&body)
            .map_err(|e| ForecastError::MalformedResponse(format!("forecast body: {}", e)))?;

        build_forecast(parsed, self.unit, self.upcoming_days)
    }
}

fn build_forecast(
    response: OpenMeteoResponse,
    unit: TemperatureUnit,
    upcoming_days: usize,
) -> Result<Forecast, ForecastError> {
    let unit = unit.resolve();
    let daily = response.daily;

    let available = daily
        .time
        .len()
        .min(daily.temperature_2m_max.len())
        .min(daily.temperature_2m_min.len());
    if available == 0 {
        return Err(ForecastError::MalformedResponse(
            "daily series is empty".to_string(),
        ));
    }

    let day_value = |series: &[Option<f64>], name: &str, i: usize| {
        series[i]
            .map(|c| unit.from_celsius(c))
            .ok_or_else(|| ForecastError::MalformedResponse(format!("{}[{}] is null", name, i)))
    };

    let today_high = day_value(&daily.temperature_2m_max, "temperature_2m_max", 0)?;
    let today_low = day_value(&daily.temperature_2m_min, "temperature_2m_min", 0)?;

    let upcoming = (1..available)
        .take(upcoming_days)
        .map(|i| -> Result<DayForecast, ForecastError> {
            Ok(DayForecast {
                date: daily.time[i].clone(),
                high: day_value(&daily.temperature_2m_max, "temperature_2m_max", i)?,
                low: day_value(&daily.temperature_2m_min, "temperature_2m_min", i)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Forecast {
        current: unit.from_celsius(response.current_weather.temperature),
        today_high,
        today_low,
        upcoming,
        unit,
        from_cache: false,
    })
}
