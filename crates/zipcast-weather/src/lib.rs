//! Weather lookup for zipcast
//!
//! Resolves US ZIP codes to coordinates via zippopotam.us, fetches current
//! and daily temperatures from Open-Meteo, and caches results in memory for
//! a freshness window.

pub mod cache;
pub mod display;
pub mod geocode;
pub mod provider;
pub mod service;
pub mod types;

pub use cache::{Clock, ForecastCache, SystemClock, DEFAULT_FRESHNESS_WINDOW};
#[cfg(any(test, feature = "test-util"))]
pub use cache::ManualClock;
pub use display::{render_forecast, EMPTY_ZIP_MESSAGE, FAILURE_MESSAGE};
pub use geocode::GeoResolver;
pub use provider::{build_client, WeatherProvider};
pub use service::{request_fetch, ForecastMessage};
pub use types::*;
pub use zipcast_core::TemperatureUnit;
