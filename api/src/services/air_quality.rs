//! Open-Meteo Air Quality client.
//!
//! Live alternative to the synthetic metrics provider. Reads the `current`
//! block of the air-quality endpoint for US AQI, PM2.5 and NO2.
//! See: https://open-meteo.com/en/docs/air-quality-api

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::AppError;
use crate::helpers::round_1dp;
use crate::models::{Coordinates, EnvironmentalMetrics};
use crate::services::metrics::{MetricsProfile, MetricsProvider};

/// NO2 conversion from µg/m³ to ppb at 25 °C and 1 atm.
const NO2_UGM3_PER_PPB: f64 = 1.88;

#[derive(Debug, Clone)]
pub struct AirQualityClient {
    client: reqwest::Client,
    base_url: String,
}

// --- Open-Meteo JSON response types ---

#[derive(Debug, Deserialize)]
struct AirQualityResponse {
    current: Option<AirQualityCurrent>,
}

#[derive(Debug, Deserialize)]
struct AirQualityCurrent {
    us_aqi: Option<f64>,
    pm2_5: Option<f64>,
    nitrogen_dioxide: Option<f64>,
}

impl AirQualityClient {
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

    /// Fetch current readings. Missing PM2.5/NO2 read as 0; a missing AQI is an error.
    pub async fn fetch_current(&self, coords: Coordinates) -> Result<EnvironmentalMetrics, AppError> {
        let url = format!("{}/v1/air-quality", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", format!("{:.4}", coords.lat)),
                ("longitude", format!("{:.4}", coords.lng)),
                ("current", "us_aqi,pm2_5,nitrogen_dioxide".to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Air quality request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Air quality API returned HTTP {}",
                response.status()
            )));
        }

        let body: AirQualityResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Air quality JSON parse error: {}", e))
        })?;

        let current = body.current.ok_or_else(|| {
            AppError::ExternalServiceError("Air quality response has no current block".to_string())
        })?;
        let aqi = current.us_aqi.ok_or_else(|| {
            AppError::ExternalServiceError("Air quality response has no us_aqi".to_string())
        })?;

        Ok(EnvironmentalMetrics {
            aqi: aqi.round().max(0.0) as u32,
            pm25: round_1dp(current.pm2_5.unwrap_or(0.0)),
            no2: round_1dp(current.nitrogen_dioxide.unwrap_or(0.0) / NO2_UGM3_PER_PPB),
            carbon_intensity: None,
        })
    }
}

#[async_trait]
impl MetricsProvider for AirQualityClient {
    fn name(&self) -> &'static str {
        "open-meteo"
    }

    /// Live readings do not depend on which flow asked.
    async fn metrics(
        &self,
        coords: Coordinates,
        _profile: MetricsProfile,
    ) -> Result<EnvironmentalMetrics, AppError> {
        self.fetch_current(coords).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> AirQualityClient {
        AirQualityClient::new(&server.uri(), "airguard-test", Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_fetch_current_converts_no2_to_ppb() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/air-quality"))
            .and(query_param("latitude", "52.5200"))
            .and(query_param("longitude", "13.4050"))
            .and(query_param("current", "us_aqi,pm2_5,nitrogen_dioxide"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "latitude": 52.52,
                "longitude": 13.42,
                "current": {
                    "time": "2026-10-16T12:00",
                    "interval": 3600,
                    "us_aqi": 57,
                    "pm2_5": 14.26,
                    "nitrogen_dioxide": 37.6
                }
            })))
            .mount(&server)
            .await;

        let metrics = client(&server)
            .metrics(Coordinates::new(52.52, 13.405), MetricsProfile::MapProbe)
            .await
            .unwrap();

        assert_eq!(metrics.aqi, 57);
        assert_eq!(metrics.pm25, 14.3);
        // 37.6 / 1.88 = 20.0
        assert_eq!(metrics.no2, 20.0);
        assert_eq!(metrics.carbon_intensity, None);
    }

    #[tokio::test]
    async fn test_missing_aqi_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/air-quality"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current": { "us_aqi": null, "pm2_5": 3.0, "nitrogen_dioxide": 1.0 }
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch_current(Coordinates::new(0.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExternalServiceError(_)));
    }

    #[tokio::test]
    async fn test_http_error_maps_to_external_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/air-quality"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch_current(Coordinates::new(0.0, 0.0))
            .await
            .unwrap_err();
        match err {
            AppError::ExternalServiceError(msg) => assert!(msg.contains("503"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
