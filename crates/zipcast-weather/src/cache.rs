//! In-memory forecast cache keyed by ZIP code.
//!
//! Entries are never evicted, only overwritten by a newer successful fetch
//! for the same ZIP. A failed refresh leaves the previous entry in place.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use zipcast_core::Config;

use crate::geocode::GeoResolver;
use crate::provider::{build_client, WeatherProvider};
use crate::types::{Forecast, ForecastError};

pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(30 * 60);

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_millis(&self) -> i64;
}

/// System wall clock that never reports a value earlier than one it has
/// already reported, even if the OS clock is stepped backwards.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicI64,
}

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let previous = self.last.fetch_max(now, Ordering::SeqCst);
        previous.max(now)
    }
}

/// Clock that only moves when told to. Used to drive freshness in tests.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

#[cfg(any(test, feature = "test-util"))]
impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        let millis = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    /// Stored with `from_cache = false`
    forecast: Forecast,
    fetched_at_ms: i64,
}

/// Resolves ZIP codes to forecasts, serving repeats from memory while fresh.
#[derive(Debug)]
pub struct ForecastCache {
    resolver: GeoResolver,
    provider: WeatherProvider,
    entries: RwLock<HashMap<String, CacheEntry>>,
    window_ms: i64,
    clock: Arc<dyn Clock>,
}

impl ForecastCache {
    pub fn new(resolver: GeoResolver, provider: WeatherProvider) -> Self {
        Self {
            resolver,
            provider,
            entries: RwLock::new(HashMap::new()),
            window_ms: duration_millis(DEFAULT_FRESHNESS_WINDOW),
            clock: Arc::new(SystemClock::default()),
        }
    }

    /// Build a cache with its own HTTP client from application config.
    pub fn from_config(config: &Config) -> Result<Self, ForecastError> {
        let weather = &config.weather;
        let client = Arc::new(build_client(weather.request_timeout())?);

        let resolver = GeoResolver::new(client.clone(), &config.endpoints.geocode_base_url)?;
        let provider = WeatherProvider::new(
            client,
            &config.endpoints.forecast_base_url,
            weather.temperature_unit,
        )?
        .with_upcoming_days(weather.forecast_days);

        Ok(Self::new(resolver, provider).with_window(weather.cache_window()))
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window_ms = duration_millis(window);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.window_ms).unwrap_or(0))
    }

    /// Get the forecast for `zip`.
    ///
    /// Within the freshness window of the last successful fetch this returns
    /// that data tagged `from_cache = true` without touching the network.
    /// Otherwise it geocodes and fetches once; success replaces the entry,
    /// failure is returned and the existing entry (if any) is kept.
    pub async fn get_forecast(&self, zip: &str) -> Result<Forecast, ForecastError> {
        let now = self.clock.now_millis();

        if let Some(cached) = self.lookup_fresh(zip, now) {
            tracing::debug!("Forecast cache hit for {}", zip);
            return Ok(cached);
        }
        tracing::debug!("Forecast cache miss for {}", zip);

        let forecast = match self.fetch_uncached(zip).await {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Forecast refresh for {} failed: {}", zip, e);
                return Err(e);
            }
        };

        self.store(zip, &forecast, now);
        tracing::info!("Fetched live forecast for {}", zip);
        Ok(forecast)
    }

    async fn fetch_uncached(&self, zip: &str) -> Result<Forecast, ForecastError> {
        let coords = self.resolver.resolve(zip).await?;
        self.provider.fetch(&coords).await
    }

    fn lookup_fresh(&self, zip: &str, now: i64) -> Option<Forecast> {
        let entries = self.entries.read();
        let entry = entries.get(zip)?;
        (now.saturating_sub(entry.fetched_at_ms) < self.window_ms)
            .then(|| entry.forecast.as_cached())
    }

    fn store(&self, zip: &str, forecast: &Forecast, fetched_at_ms: i64) {
        let mut entries = self.entries.write();
        // An older request finishing late must not replace a newer entry
        if let Some(existing) = entries.get(zip) {
            if existing.fetched_at_ms > fetched_at_ms {
                return;
            }
        }
        entries.insert(
            zip.to_string(),
            CacheEntry {
                forecast: Forecast {
                    from_cache: false,
                    ..forecast.clone()
                },
                fetched_at_ms,
            },
        );
    }

    /// When the entry for `zip` was fetched, in epoch milliseconds.
    pub fn fetched_at(&self, zip: &str) -> Option<i64> {
        self.entries.read().get(zip).map(|e| e.fetched_at_ms)
    }

    pub fn invalidate(&self, zip: &str) -> bool {
        self.entries.write().remove(zip).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DayForecast;
    use zipcast_core::TemperatureUnit;

    fn sample(current: f64) -> Forecast {
        Forecast {
            current,
            today_high: 50.0,
            today_low: 35.6,
            upcoming: vec![DayForecast {
                date: "2024-01-02".into(),
                high: 53.6,
                low: 37.4,
            }],
            unit: TemperatureUnit::Fahrenheit,
            from_cache: false,
        }
    }

    fn offline_cache(clock: Arc<ManualClock>) -> ForecastCache {
        let config = Config::default();
        ForecastCache::from_config(&config).unwrap().with_clock(clock)
    }

    #[test]
    fn test_system_clock_never_goes_backwards() {
        let clock = SystemClock::default();
        clock.last.store(i64::MAX - 1, Ordering::SeqCst);
        assert_eq!(clock.now_millis(), i64::MAX - 1);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        clock.advance(Duration::from_secs(2));
        assert_eq!(clock.now_millis(), 3_000);
    }

    #[test]
    fn test_default_window_is_thirty_minutes() {
        let cache = offline_cache(Arc::new(ManualClock::new(0)));
        assert_eq!(cache.window().as_millis(), 1_800_000);
    }

    #[test]
    fn test_fresh_lookup_marks_copy_cached() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = offline_cache(clock.clone());
        cache.store("10001", &sample(68.0), 0);

        clock.advance(Duration::from_millis(1_799_999));
        let hit = cache.lookup_fresh("10001", clock.now_millis()).unwrap();
        assert!(hit.from_cache);
        assert_eq!(hit.current, 68.0);

        // stored entry stays live-tagged
        let stored = cache.entries.read().get("10001").cloned().unwrap();
        assert!(!stored.forecast.from_cache);
    }

    #[test]
    fn test_window_boundary_is_stale() {
        let cache = offline_cache(Arc::new(ManualClock::new(0)));
        cache.store("10001", &sample(68.0), 0);
        assert!(cache.lookup_fresh("10001", 1_800_000).is_none());
        // stale entries are retained
        assert_eq!(cache.fetched_at("10001"), Some(0));
    }

    #[test]
    fn test_store_never_saves_cached_flag() {
        let cache = offline_cache(Arc::new(ManualClock::new(0)));
        cache.store("10001", &sample(68.0).as_cached(), 0);
        let stored = cache.entries.read().get("10001").cloned().unwrap();
        assert!(!stored.forecast.from_cache);
    }

    #[test]
    fn test_older_fetch_does_not_replace_newer() {
        let cache = offline_cache(Arc::new(ManualClock::new(0)));
        cache.store("10001", &sample(70.0), 5_000);
        cache.store("10001", &sample(60.0), 1_000);

        let hit = cache.lookup_fresh("10001", 6_000).unwrap();
        assert_eq!(hit.current, 70.0);
        assert_eq!(cache.fetched_at("10001"), Some(5_000));
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = offline_cache(Arc::new(ManualClock::new(0)));
        assert!(cache.is_empty());
        cache.store("10001", &sample(68.0), 0);
        cache.store("90210", &sample(75.0), 0);
        assert_eq!(cache.len(), 2);

        assert!(cache.invalidate("10001"));
        assert!(!cache.invalidate("10001"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_window_never_hits() {
        let cache = offline_cache(Arc::new(ManualClock::new(0))).with_window(Duration::ZERO);
        cache.store("10001", &sample(68.0), 0);
        assert!(cache.lookup_fresh("10001", 0).is_none());
    }
}
