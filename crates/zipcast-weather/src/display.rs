//! Plain-text presentation of a forecast.

use crate::types::Forecast;

pub const FAILURE_MESSAGE: &str = "Failed to load weather";
pub const EMPTY_ZIP_MESSAGE: &str = "Enter a ZIP code";
const UPCOMING_HEADER: &str = "Next 3 days:";

pub fn freshness_label(from_cache: bool) -> &'static str {
    if from_cache {
        "⚡ From cache"
    } else {
        "☁️ Live data"
    }
}

/// Render a forecast the way the lookup window shows it. Temperatures are
/// rounded to one decimal here and nowhere else.
pub fn render_forecast(forecast: &Forecast) -> String {
    let sym = forecast.unit.symbol();
    let mut lines = vec![
        format!("Current: {:.1} {}", forecast.current, sym),
        format!(
            "Today High: {:.1} {}, Low: {:.1} {}",
            forecast.today_high, sym, forecast.today_low, sym
        ),
        String::new(),
        UPCOMING_HEADER.to_string(),
    ];

    lines.extend(forecast.upcoming.iter().map(|day| {
        format!(
            "{} → High: {:.1} {}, Low: {:.1} {}",
            day.date, day.high, sym, day.low, sym
        )
    }));

    lines.push(freshness_label(forecast.from_cache).to_string());
    lines.join("\n")
}
