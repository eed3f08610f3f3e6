//! OpenStreetMap Nominatim forward geocoder.
//!
//! Used to resolve a chosen search candidate's title into coordinates.
//! Nominatim's usage policy requires an identifying User-Agent.

use std::time::Duration;

use serde::Deserialize;

use crate::errors::AppError;
use crate::models::Coordinates;

#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

/// Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
}

impl NominatimClient {
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

    /// Coordinates of the best match for `query`, `None` when nothing matched.
    pub async fn forward(&self, query: &str) -> Result<Option<Coordinates>, AppError> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("format", "json"), ("q", query)])
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Nominatim request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Nominatim returned HTTP {}",
                response.status()
            )));
        }

        let results: Vec<SearchResult> = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Nominatim JSON parse error: {}", e))
        })?;

        let Some(first) = results.into_iter().next() else {
            tracing::debug!("Nominatim found nothing for '{}'", query);
            return Ok(None);
        };

        let lat = first.lat.trim().parse::<f64>();
        let lon = first.lon.trim().parse::<f64>();
        match (lat, lon) {
            (Ok(lat), Ok(lng)) => Ok(Some(Coordinates::new(lat, lng))),
            _ => Err(AppError::ExternalServiceError(format!(
                "Nominatim returned unparseable coordinates '{}', '{}'",
                first.lat, first.lon
            ))),
        }
    }
}
