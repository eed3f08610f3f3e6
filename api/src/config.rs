/// Where environmental metrics for a coordinate come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsSource {
    /// Random placeholder values within fixed ranges.
    Synthetic,
    /// Placeholder values keyed on the coordinate, stable across restarts.
    Seeded,
    /// Open-Meteo air-quality API.
    OpenMeteo,
}

impl MetricsSource {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "open-meteo" | "openmeteo" | "live" => MetricsSource::OpenMeteo,
            "seeded" | "deterministic" => MetricsSource::Seeded,
            "synthetic" | "" => MetricsSource::Synthetic,
            other => {
                tracing::warn!(
                    "Unknown METRICS_PROVIDER '{}', falling back to synthetic",
                    other
                );
                MetricsSource::Synthetic
            }
        }
    }
}

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub user_agent: String,
    /// Gemini API key. Place search is disabled when unset.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub nominatim_base_url: String,
    pub open_meteo_base_url: String,
    pub air_quality_base_url: String,
    pub metrics_source: MetricsSource,
    /// Seed prefix for the seeded metrics source.
    pub metrics_seed_prefix: String,
    /// Simulated latency before a map probe's metrics land.
    pub probe_latency_ms: u64,
    /// Simulated latency before a device fix's metrics land.
    pub device_fix_latency_ms: u64,
    pub http_timeout_secs: u64,
    /// Sessions untouched for this long are evicted.
    pub session_idle_ttl_secs: u64,
    pub session_sweep_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
            user_agent: std::env::var("AIRGUARD_USER_AGENT")
                .unwrap_or_else(|_| "AirGuard/0.1 (air quality companion)".to_string()),
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            gemini_base_url: std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta".to_string()
            }),
            nominatim_base_url: std::env::var("NOMINATIM_BASE_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            open_meteo_base_url: std::env::var("OPEN_METEO_BASE_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com".to_string()),
            air_quality_base_url: std::env::var("AIR_QUALITY_BASE_URL")
                .unwrap_or_else(|_| "https://air-quality-api.open-meteo.com".to_string()),
            metrics_source: MetricsSource::parse(
                &std::env::var("METRICS_PROVIDER").unwrap_or_default(),
            ),
            metrics_seed_prefix: std::env::var("METRICS_SEED_PREFIX")
                .unwrap_or_else(|_| "airguard".to_string()),
            probe_latency_ms: std::env::var("PROBE_LATENCY_MS")
                .unwrap_or_else(|_| "800".to_string())
                .parse()
                .expect("PROBE_LATENCY_MS must be a valid u64"),
            device_fix_latency_ms: std::env::var("DEVICE_FIX_LATENCY_MS")
                .unwrap_or_else(|_| "1500".to_string())
                .parse()
                .expect("DEVICE_FIX_LATENCY_MS must be a valid u64"),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("HTTP_TIMEOUT_SECS must be a valid u64"),
            session_idle_ttl_secs: std::env::var("SESSION_IDLE_TTL_SECS")
                .unwrap_or_else(|_| "1800".to_string())
                .parse()
                .expect("SESSION_IDLE_TTL_SECS must be a valid u64"),
            session_sweep_interval_secs: std::env::var("SESSION_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .expect("SESSION_SWEEP_INTERVAL_SECS must be a valid u64"),
        }
    }
}
