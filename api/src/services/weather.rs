//! Open-Meteo forecast client (current conditions only).
//!
//! See: https://open-meteo.com/en/docs

use std::time::Duration;

use serde::Deserialize;

use crate::errors::AppError;
use crate::helpers::round_1dp;
use crate::models::{Coordinates, WeatherSnapshot};

const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,apparent_temperature,precipitation,weather_code,wind_speed_10m";

/// Client for the Open-Meteo forecast API.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
}

// --- Open-Meteo JSON response types ---

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentConditions>,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    apparent_temperature: Option<f64>,
    precipitation: Option<f64>,
    weather_code: Option<i32>,
    wind_speed_10m: Option<f64>,
}

/// Map a WMO weather code to `(icon, label)`.
pub fn weather_condition(code: i32) -> (&'static str, &'static str) {
    match code {
        0 => ("sunny", "Clear Sky"),
        1..=3 => ("cloud", "Partly Cloudy"),
        4..=48 => ("foggy", "Foggy"),
        49..=67 => ("rainy", "Light Rain"),
        68..=77 => ("ac_unit", "Snowing"),
        78..=82 => ("rainy", "Heavy Rain"),
        83..=99 => ("thunderstorm", "Stormy"),
        _ => ("wb_cloudy", "Cloudy"),
    }
}

impl WeatherClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch current conditions at a coordinate.
    pub async fn fetch_current(&self, coords: Coordinates) -> Result<WeatherSnapshot, AppError> {
        let url = format!("{}/v1/forecast", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", coords.lat.to_string()),
                ("longitude", coords.lng.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("wind_speed_unit", "ms".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("Weather request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Open-Meteo returned HTTP {}",
                response.status()
            )));
        }

        let body: ForecastResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Open-Meteo JSON parse error: {}", e))
        })?;

        let current = body.current.ok_or_else(|| {
            AppError::ExternalServiceError("Open-Meteo response has no current block".to_string())
        })?;

        Ok(parse_current(&current))
    }
}

fn parse_current(current: &CurrentConditions) -> WeatherSnapshot {
    // Unknown code falls into the catch-all bucket.
    let code = current.weather_code.unwrap_or(-1);
    let (icon, label) = weather_condition(code);
    let temperature = current.temperature_2m.unwrap_or(0.0);

    WeatherSnapshot {
        temperature_c: round_1dp(temperature),
        feels_like_c: round_1dp(current.apparent_temperature.unwrap_or(temperature)),
        humidity_pct: current.relative_humidity_2m.unwrap_or(0.0),
        wind_speed_ms: round_1dp(current.wind_speed_10m.unwrap_or(0.0)),
        precipitation_mm: round_1dp(current.precipitation.unwrap_or(0.0)),
        weather_code: code,
        condition: icon.to_string(),
        condition_text: label.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_weather_code_buckets() {
        assert_eq!(weather_condition(0), ("sunny", "Clear Sky"));
        assert_eq!(weather_condition(1), ("cloud", "Partly Cloudy"));
        assert_eq!(weather_condition(3), ("cloud", "Partly Cloudy"));
        assert_eq!(weather_condition(45), ("foggy", "Foggy"));
        assert_eq!(weather_condition(48), ("foggy", "Foggy"));
        assert_eq!(weather_condition(51), ("rainy", "Light Rain"));
        assert_eq!(weather_condition(67), ("rainy", "Light Rain"));
        assert_eq!(weather_condition(71), ("ac_unit", "Snowing"));
        assert_eq!(weather_condition(77), ("ac_unit", "Snowing"));
        assert_eq!(weather_condition(80), ("rainy", "Heavy Rain"));
        assert_eq!(weather_condition(82), ("rainy", "Heavy Rain"));
        assert_eq!(weather_condition(95), ("thunderstorm", "Stormy"));
        assert_eq!(weather_condition(99), ("thunderstorm", "Stormy"));
        assert_eq!(weather_condition(100), ("wb_cloudy", "Cloudy"));
        assert_eq!(weather_condition(-1), ("wb_cloudy", "Cloudy"));
    }

    #[test]
    fn test_parse_current_defaults() {
        let current = CurrentConditions {
            temperature_2m: Some(18.25),
            relative_humidity_2m: None,
            apparent_temperature: None,
            precipitation: None,
            weather_code: None,
            wind_speed_10m: None,
        };
        let snapshot = parse_current(&current);
        assert_eq!(snapshot.temperature_c, 18.3);
        // Feels-like falls back to the air temperature.
        assert_eq!(snapshot.feels_like_c, 18.3);
        assert_eq!(snapshot.condition_text, "Cloudy");
        assert_eq!(snapshot.weather_code, -1);
    }

    #[tokio::test]
    async fn test_fetch_current() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "37.7749"))
            .and(query_param("longitude", "-122.4194"))
            .and(query_param("current", CURRENT_FIELDS))
            .and(query_param("wind_speed_unit", "ms"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "latitude": 37.763283,
                "longitude": -122.41286,
                "current": {
                    "time": "2026-10-16T14:00",
                    "interval": 900,
                    "temperature_2m": 17.4,
                    "relative_humidity_2m": 72,
                    "apparent_temperature": 16.1,
                    "precipitation": 0.0,
                    "weather_code": 2,
                    "wind_speed_10m": 4.6
                }
            })))
            .mount(&server)
            .await;

        let client = WeatherClient::new(&server.uri(), "airguard-test", Duration::from_secs(5));
        let snapshot = client
            .fetch_current(Coordinates::new(37.7749, -122.4194))
            .await
            .unwrap();

        assert_eq!(snapshot.temperature_c, 17.4);
        assert_eq!(snapshot.feels_like_c, 16.1);
        assert_eq!(snapshot.humidity_pct, 72.0);
        assert_eq!(snapshot.wind_speed_ms, 4.6);
        assert_eq!(snapshot.weather_code, 2);
        assert_eq!(snapshot.condition, "cloud");
        assert_eq!(snapshot.condition_text, "Partly Cloudy");
    }

    #[tokio::test]
    async fn test_fetch_current_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = WeatherClient::new(&server.uri(), "airguard-test", Duration::from_secs(5));
        let result = client.fetch_current(Coordinates::new(0.0, 0.0)).await;
        tokio_test::assert_err!(result);
    }
}
