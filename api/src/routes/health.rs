use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::services::registry::SharedRegistry;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status (always "ok" while the process serves requests)
    pub status: String,
    /// API version
    pub version: String,
    /// Active metrics provider ("synthetic" or "open-meteo")
    pub metrics_provider: String,
    /// Whether grounded place search is configured
    pub search_enabled: bool,
    /// Number of live sessions
    pub active_sessions: usize,
}

/// Health check endpoint.
///
/// Reports the API version and which optional collaborators are configured.
/// Search being disabled is not a failure; only the search endpoint refuses.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_check(State(registry): State<SharedRegistry>) -> Json<HealthResponse> {
    let services = registry.services();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        metrics_provider: services.metrics.name().to_string(),
        search_enabled: services.search.is_some(),
        active_sessions: registry.len().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::services::metrics::SyntheticMetricsProvider;
    use crate::services::nominatim::NominatimClient;
    use crate::services::registry::SessionRegistry;
    use crate::services::session::SessionServices;
    use crate::services::weather::WeatherClient;

    #[tokio::test]
    async fn test_health_reports_collaborators() {
        let timeout = Duration::from_secs(1);
        let registry = Arc::new(SessionRegistry::new(SessionServices {
            metrics: Arc::new(SyntheticMetricsProvider::new()),
            search: None,
            geocoder: NominatimClient::new("http://127.0.0.1:9", "ua", timeout),
            weather: WeatherClient::new("http://127.0.0.1:9", "ua", timeout),
            probe_latency: Duration::from_millis(800),
            device_fix_latency: Duration::from_millis(1500),
        }));
        registry.create(crate::models::User::default()).await;

        let Json(health) = health_check(State(registry)).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.metrics_provider, "synthetic");
        assert!(!health.search_enabled);
        assert_eq!(health.active_sessions, 1);
    }
}
