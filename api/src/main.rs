// AirGuard API v0.1
use axum::routing::{get, post, put};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod helpers;
mod models;
mod routes;
mod services;

use config::{AppConfig, MetricsSource};
use services::air_quality::AirQualityClient;
use services::gemini::GroundedSearchClient;
use services::metrics::{MetricsProvider, SeededMetricsProvider, SyntheticMetricsProvider};
use services::nominatim::NominatimClient;
use services::registry::{run_reaper, SessionRegistry, SharedRegistry};
use services::session::SessionServices;
use services::weather::WeatherClient;

/// OpenAPI document for the AirGuard API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "AirGuard API",
        version = "0.1.0",
        description = "Air-quality companion API. Tracks a per-session location with \
            air-quality readings, resolves places through device fixes, grounded AI \
            search and map probes, latches an emergency alert on hazardous air, and \
            estimates household carbon footprints.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Sessions", description = "Session lifecycle and navigation"),
        (name = "Location", description = "Device fix, place search and map probes"),
        (name = "Footprint", description = "Household carbon footprint calculator"),
        (name = "Emergency", description = "Hazardous air alert and siren"),
        (name = "Map", description = "Heatmap overlay, history chart and weather"),
    ),
    paths(
        routes::health::health_check,
        routes::sessions::create_session,
        routes::sessions::get_session,
        routes::sessions::delete_session,
        routes::sessions::navigate,
        routes::location::get_location,
        routes::location::locate_device,
        routes::location::search,
        routes::location::select_candidate,
        routes::location::map_click,
        routes::footprint::calculate_footprint,
        routes::footprint::set_impact,
        routes::footprint::calculate_session_footprint,
        routes::footprint::get_session_footprint,
        routes::emergency::get_emergency,
        routes::emergency::engage_emergency,
        routes::emergency::dismiss_emergency,
        routes::map::get_heatmap,
        routes::map::cycle_heatmap,
        routes::map::set_heatmap_date,
        routes::map::get_history,
        routes::map::set_history_base_date,
        routes::map::get_weather,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::sessions::CreateSessionRequest,
            routes::sessions::NavigateRequest,
            routes::location::DeviceFixRequest,
            routes::location::SearchRequest,
            routes::location::MapClickRequest,
            routes::footprint::CalculateRequest,
            routes::emergency::DismissRequest,
            routes::map::DateRequest,
            services::session::SessionView,
            services::session::LocationOutcome,
            services::session::PositionReport,
            services::session::FootprintReport,
            services::session::EmergencyStatus,
            services::session::HeatmapView,
            services::session::HistoryView,
            services::session::SearchView,
            services::session::MapView,
            services::search::LookupScope,
            services::emergency::EmergencyState,
            services::emergency::AlertCause,
            services::emergency::DismissAction,
            services::footprint::ImpactStatus,
            services::footprint::ReductionTip,
            services::heatmap::HeatmapMode,
            services::aqi::AqiCategory,
            services::aqi::AqiTheme,
            models::Coordinates,
            models::LocationData,
            models::ImpactData,
            models::Breakdown,
            models::FootprintResult,
            models::HistoryPoint,
            models::HeatmapPoint,
            models::Screen,
            models::User,
            models::GroundingCandidate,
            models::WeatherSnapshot,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airguard_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    let timeout = Duration::from_secs(config.http_timeout_secs);

    // Metrics provider
    let metrics: Arc<dyn MetricsProvider> = match config.metrics_source {
        MetricsSource::Synthetic => Arc::new(SyntheticMetricsProvider::new()),
        MetricsSource::Seeded => Arc::new(SeededMetricsProvider::new(
            config.metrics_seed_prefix.clone(),
        )),
        MetricsSource::OpenMeteo => Arc::new(AirQualityClient::new(
            &config.air_quality_base_url,
            &config.user_agent,
            timeout,
        )),
    };
    tracing::info!("Using {} metrics provider", metrics.name());

    // Grounded search is optional
    let search = config.gemini_api_key.as_deref().map(|key| {
        GroundedSearchClient::new(
            &config.gemini_base_url,
            key,
            &config.gemini_model,
            &config.user_agent,
            timeout,
        )
    });
    if search.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; place search is disabled");
    }

    let registry: SharedRegistry = Arc::new(SessionRegistry::new(SessionServices {
        metrics,
        search,
        geocoder: NominatimClient::new(&config.nominatim_base_url, &config.user_agent, timeout),
        weather: WeatherClient::new(&config.open_meteo_base_url, &config.user_agent, timeout),
        probe_latency: Duration::from_millis(config.probe_latency_ms),
        device_fix_latency: Duration::from_millis(config.device_fix_latency_ms),
    }));

    // Spawn idle-session reaper
    tokio::spawn(run_reaper(
        registry.clone(),
        Duration::from_secs(config.session_idle_ttl_secs),
        Duration::from_secs(config.session_sweep_interval_secs),
    ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers(Any);

    // Build router
    let session_routes = Router::new()
        .route("/api/v1/sessions", post(routes::sessions::create_session))
        .route(
            "/api/v1/sessions/:id",
            get(routes::sessions::get_session).delete(routes::sessions::delete_session),
        )
        .route("/api/v1/sessions/:id/screen", put(routes::sessions::navigate))
        .with_state(registry.clone());

    let location_routes = Router::new()
        .route(
            "/api/v1/sessions/:id/location",
            get(routes::location::get_location),
        )
        .route(
            "/api/v1/sessions/:id/location/device",
            post(routes::location::locate_device),
        )
        .route(
            "/api/v1/sessions/:id/location/search",
            post(routes::location::search),
        )
        .route(
            "/api/v1/sessions/:id/location/candidates/:index",
            post(routes::location::select_candidate),
        )
        .route(
            "/api/v1/sessions/:id/location/map",
            post(routes::location::map_click),
        )
        .with_state(registry.clone());

    let footprint_routes = Router::new()
        .route(
            "/api/v1/sessions/:id/impact",
            put(routes::footprint::set_impact),
        )
        .route(
            "/api/v1/sessions/:id/footprint",
            get(routes::footprint::get_session_footprint)
                .post(routes::footprint::calculate_session_footprint),
        )
        .with_state(registry.clone());

    let emergency_routes = Router::new()
        .route(
            "/api/v1/sessions/:id/emergency",
            get(routes::emergency::get_emergency),
        )
        .route(
            "/api/v1/sessions/:id/emergency/engage",
            post(routes::emergency::engage_emergency),
        )
        .route(
            "/api/v1/sessions/:id/emergency/dismiss",
            post(routes::emergency::dismiss_emergency),
        )
        .with_state(registry.clone());

    let map_routes = Router::new()
        .route(
            "/api/v1/sessions/:id/map/heatmap",
            get(routes::map::get_heatmap),
        )
        .route(
            "/api/v1/sessions/:id/map/heatmap/cycle",
            post(routes::map::cycle_heatmap),
        )
        .route(
            "/api/v1/sessions/:id/map/heatmap/date",
            put(routes::map::set_heatmap_date),
        )
        .route(
            "/api/v1/sessions/:id/map/history",
            get(routes::map::get_history),
        )
        .route(
            "/api/v1/sessions/:id/map/history/base-date",
            put(routes::map::set_history_base_date),
        )
        .route(
            "/api/v1/sessions/:id/map/weather",
            get(routes::map::get_weather),
        )
        .with_state(registry.clone());

    let health_routes = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .with_state(registry);

    // The stateless calculator needs no session
    let calculator_routes = Router::new().route(
        "/api/v1/footprint",
        post(routes::footprint::calculate_footprint),
    );

    let app = Router::new()
        .merge(health_routes)
        .merge(session_routes)
        .merge(location_routes)
        .merge(footprint_routes)
        .merge(emergency_routes)
        .merge(map_routes)
        .merge(calculator_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
