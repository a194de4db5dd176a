//! Forward geocoding: convert a US ZIP code to coordinates.
//! Uses zippopotam.us - free, no API key required.

use crate::types::{Coordinates, ForecastError};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

const COUNTRY: &str = "us";

#[derive(Debug, Deserialize)]
struct ZippopotamResponse {
    places: Vec<ZippopotamPlace>,
}

#[derive(Debug, Deserialize)]
struct ZippopotamPlace {
    latitude: String,
    longitude: String,
    #[serde(rename = "place name")]
    place_name: Option<String>,
    #[serde(rename = "state abbreviation")]
    state: Option<String>,
}

/// Resolves ZIP codes through a zippopotam.us compatible endpoint.
#[derive(Debug, Clone)]
pub struct GeoResolver {
    client: Arc<Client>,
    base_url: Url,
}

impl GeoResolver {
    pub fn new(client: Arc<Client>, base_url: &str) -> Result<Self, ForecastError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ForecastError::Endpoint(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ForecastError::Endpoint(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    fn lookup_url(&self, zip: &str) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new(), so segments are always available
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(COUNTRY).push(zip);
        }
        url
    }

    /// Resolve `zip` to the coordinates of its first listed place.
    ///
    /// The ZIP is not validated here; anything the upstream does not
    /// recognize comes back as [`ForecastError::InvalidLocation`].
    pub async fn resolve(&self, zip: &str) -> Result<Coordinates, ForecastError> {
        let url = self.lookup_url(zip);

        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::debug!("Geocode request for {} failed: {}", zip, e);
            ForecastError::from(e)
        })?;

        if response.status() != StatusCode::OK {
            tracing::debug!("Geocode for {} returned status {}", zip, response.status());
            return Err(ForecastError::InvalidLocation(zip.to_string()));
        }

        let body = response.text().await?;
        parse_places(zip, &body)
    }
}

fn parse_places(zip: &str, body: &str) -> Result<Coordinates, ForecastError> {
    let parsed: ZippopotamResponse = serde_json::from_str(body)
        .map_err(|e| ForecastError::MalformedResponse(format!("geocode body: {}", e)))?;

    let place = parsed
        .places
        .into_iter()
        .next()
        .ok_or_else(|| ForecastError::InvalidLocation(zip.to_string()))?;

    let latitude = parse_degrees("latitude", &place.latitude)?;
    let longitude = parse_degrees("longitude", &place.longitude)?;

    match (&place.place_name, &place.state) {
        (Some(name), Some(state)) => tracing::info!("Resolved {} to {}, {}", zip, name, state),
        _ => tracing::info!("Resolved {} to {}, {}", zip, latitude, longitude),
    }

    Ok(Coordinates {
        latitude,
        longitude,
    })
}

fn parse_degrees(field: &str, raw: &str) -> Result<f64, ForecastError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ForecastError::MalformedResponse(format!("{} '{}' is not a number", field, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(base: &str) -> GeoResolver {
        GeoResolver::new(Arc::new(Client::new()), base).unwrap()
    }

    #[test]
    fn test_lookup_url_appends_country_and_zip() {
        let r = resolver("https://api.zippopotam.us");
        assert_eq!(r.lookup_url("10001").as_str(), "https://api.zippopotam.us/us/10001");

        let r = resolver("http://localhost:9000/geo/");
        assert_eq!(r.lookup_url("90210").as_str(), "http://localhost:9000/geo/us/90210");
    }

    #[test]
    fn test_lookup_url_escapes_zip_as_one_segment() {
        let r = resolver("https://api.zippopotam.us");
        assert_eq!(
            r.lookup_url("12/34 5").as_str(),
            "https://api.zippopotam.us/us/12%2F34%205"
        );
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(matches!(
            GeoResolver::new(Arc::new(Client::new()), "mailto:someone@example.com"),
            Err(ForecastError::Endpoint(_))
        ));
        assert!(GeoResolver::new(Arc::new(Client::new()), "::not a url").is_err());
    }

    #[test]
    fn test_parse_first_place() {
        let body = r#"{
            "post code": "10001",
            "places": [
                {"place name": "New York City", "state abbreviation": "NY",
                 "latitude": "40.7128", "longitude": "-74.0060"},
                {"place name": "Elsewhere", "latitude": "1.0", "longitude": "2.0"}
            ]
        }"#;
        let coords = parse_places("10001", body).unwrap();
        assert_eq!(coords.latitude, 40.7128);
        assert_eq!(coords.longitude, -74.006);
    }

    #[test]
    fn test_parse_empty_places_is_invalid_location() {
        let err = parse_places("00000", r#"{"places": []}"#).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidLocation(z) if z == "00000"));
    }

    #[test]
    fn test_parse_missing_places_is_malformed() {
        let err = parse_places("10001", r#"{"post code": "10001"}"#).unwrap_err();
        assert!(matches!(err, ForecastError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_non_numeric_latitude_is_malformed() {
        let body = r#"{"places": [{"latitude": "north", "longitude": "-74.0"}]}"#;
        let err = parse_places("10001", body).unwrap_err();
        assert!(matches!(err, ForecastError::MalformedResponse(m) if m.contains("latitude")));
    }

    #[tokio::test]
    #[ignore] // Run with: cargo test -p zipcast-weather -- --ignored
    async fn test_resolve_live_manhattan() {
        let r = resolver(zipcast_core::DEFAULT_GEOCODE_BASE_URL);
        let coords = r.resolve("10001").await.unwrap();
        assert!((coords.latitude - 40.75).abs() < 0.5);
        assert!((coords.longitude + 74.0).abs() < 0.5);
    }
}
