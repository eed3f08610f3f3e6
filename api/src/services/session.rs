//! Per-user session: the explicit application state and the operations that
//! mutate it.
//!
//! A [`Session`] owns one [`SessionState`] behind an async `RwLock`. Handlers
//! never touch the state directly; every location change funnels through
//! `commit_location`, which replaces the location wholesale and feeds the new
//! AQI to the emergency trigger.
//!
//! Flows that await before committing (device fix, search, candidate
//! geocoding, map probes) take a [`RequestToken`] first and only commit while
//! that token is still current, so a slow response can never overwrite a
//! newer one. Map probes run as spawned tasks; starting a new probe aborts
//! the previous one, and [`Session::teardown`] aborts whatever is pending and
//! silences the siren.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    Coordinates, FootprintResult, GroundingCandidate, HeatmapPoint, HistoryPoint, ImpactData,
    LocationData, Screen, User, WeatherSnapshot,
};
use crate::services::aqi::AqiTheme;
use crate::services::emergency::{
    AlertCause, DismissAction, EmergencyState, EmergencyTrigger, Siren,
};
use crate::services::fence::{RequestFence, RequestToken};
use crate::services::footprint::{self, ImpactStatus, ReductionTip, REDUCTION_TIPS};
use crate::services::gemini::GroundedSearchClient;
use crate::services::heatmap::{generate_heatmap, HeatmapMode};
use crate::services::history::generate_history;
use crate::services::metrics::{MetricsProfile, MetricsProvider};
use crate::services::nominatim::NominatimClient;
use crate::services::search::{self, GridContext, LookupScope, DEFAULT_CO2_FACTOR};
use crate::services::weather::WeatherClient;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Readings applied with a calculator grid context.
const GRID_AQI: u32 = 45;
const GRID_PM25: f64 = 10.0;
const GRID_NO2: f64 = 5.0;

/// Profile for a calculator candidate that carried none.
const CANDIDATE_FALLBACK_PROFILE: &str = "Regional Profile";
const PIN_NAME: &str = "Pinned Location";
const PIN_PROFILE: &str = "Manual Pin";
const GPS_NAME: &str = "My GPS Position";
const GPS_PROFILE: &str = "Active Tracking";
/// Name given to a device fix taken from the map.
const MAP_FIX_NAME: &str = "My Location";

const SUPERSEDED: &str = "Superseded by a newer request";

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// External collaborators shared by every session.
pub struct SessionServices {
    pub metrics: Arc<dyn MetricsProvider>,
    /// `None` when no Gemini API key is configured.
    pub search: Option<GroundedSearchClient>,
    pub geocoder: NominatimClient,
    pub weather: WeatherClient,
    pub probe_latency: Duration,
    pub device_fix_latency: Duration,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Result of the client's platform position request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PositionReport {
    Fix {
        lat: f64,
        lng: f64,
    },
    /// The platform has no geolocation capability.
    Unsupported,
    PermissionDenied {
        #[serde(default)]
        message: String,
    },
    Unavailable {
        #[serde(default)]
        message: String,
    },
    Timeout {
        #[serde(default)]
        message: String,
    },
}

impl PositionReport {
    fn into_coordinates(self) -> Result<Coordinates, AppError> {
        match self {
            PositionReport::Fix { lat, lng } => validate_coordinates(lat, lng),
            PositionReport::Unsupported => Err(AppError::Geolocation(
                "Geolocation is not supported by your browser".to_string(),
            )),
            PositionReport::PermissionDenied { message }
            | PositionReport::Unavailable { message }
            | PositionReport::Timeout { message } => Err(AppError::Geolocation(
                format!("Unable to retrieve your location. {}", message)
                    .trim_end()
                    .to_string(),
            )),
        }
    }
}

pub fn validate_coordinates(lat: f64, lng: f64) -> Result<Coordinates, AppError> {
    if !lat.is_finite() || !lng.is_finite() || lat.abs() > 90.0 || lng.abs() > 180.0 {
        return Err(AppError::BadRequest(format!(
            "Invalid coordinates ({}, {})",
            lat, lng
        )));
    }
    Ok(Coordinates::new(lat, lng))
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Search text and the disambiguation list from the last search.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub scope: Option<LookupScope>,
    pub query: String,
    pub candidates: Vec<GroundingCandidate>,
}

#[derive(Debug, Clone)]
pub struct MapState {
    pub selected: Coordinates,
    /// A probe for `selected` has not landed yet.
    pub probing: bool,
    /// Token of the map selection that owns `probing`.
    pub spinner_token: Option<RequestToken>,
    pub heatmap_mode: HeatmapMode,
    pub heatmap_date: NaiveDate,
    pub history_base_date: NaiveDate,
    pub history: Vec<HistoryPoint>,
    pub weather: Option<WeatherSnapshot>,
}

/// Everything a session knows. Mutated only through [`Session`] operations.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub screen: Screen,
    pub user: User,
    pub location: LocationData,
    pub impact: ImpactData,
    pub results: Option<FootprintResult>,
    pub emergency: EmergencyTrigger,
    /// Eco profile of the last applied grid context.
    pub eco_profile: Option<String>,
    pub search: SearchState,
    pub map: MapState,
}

impl SessionState {
    pub fn new(user: User, today: NaiveDate) -> Self {
        let location = LocationData::default();
        let selected = location
            .coordinates()
            .unwrap_or(Coordinates::new(37.7749, -122.4194));
        let mut state = Self {
            screen: Screen::Dashboard,
            user,
            location,
            impact: ImpactData::default(),
            results: None,
            emergency: EmergencyTrigger::default(),
            eco_profile: None,
            search: SearchState::default(),
            map: MapState {
                selected,
                probing: false,
                spinner_token: None,
                heatmap_mode: HeatmapMode::Live,
                heatmap_date: today,
                history_base_date: today,
                history: Vec::new(),
                weather: None,
            },
        };
        if let Err(e) = state.regenerate_history() {
            tracing::warn!("Initial history unavailable: {}", e);
        }
        state
    }

    /// Bottom navigation is hidden on Results and Profile and under the
    /// emergency overlay.
    pub fn bottom_nav_visible(&self) -> bool {
        !matches!(self.screen, Screen::Results | Screen::Profile) && !self.emergency.is_alerting()
    }

    fn regenerate_history(&mut self) -> Result<(), AppError> {
        self.map.history = self.history_for(self.map.history_base_date)?;
        Ok(())
    }

    fn history_for(&self, base_date: NaiveDate) -> Result<Vec<HistoryPoint>, AppError> {
        let mut rng = rand::thread_rng();
        generate_history(
            self.location.aqi,
            self.location.carbon_intensity_or_default(),
            base_date,
            &mut rng,
        )
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// What a location-changing request did.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LocationOutcome {
    /// The session location was replaced by this request.
    pub applied: bool,
    /// A map probe was started; its reading lands after the probe latency.
    pub pending: bool,
    /// Disambiguation list, when the search came back with grounded places.
    pub candidates: Vec<GroundingCandidate>,
    /// The session location after this request.
    pub location: LocationData,
    pub emergency: EmergencyState,
    /// Current household emission factor (kg CO2/kWh).
    pub co2_rate: f64,
    pub eco_profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EmergencyStatus {
    pub state: EmergencyState,
    pub cause: Option<AlertCause>,
    /// Reading that latched the trigger.
    pub trigger_aqi: Option<u32>,
    pub since: Option<DateTime<Utc>>,
    pub current_aqi: u32,
    pub location_name: String,
    pub siren_active: bool,
    /// Instantaneous siren pitch, while it is running.
    pub siren_frequency_hz: Option<f64>,
    /// Full sweeps the siren has completed, while it is running.
    pub siren_cycles: Option<u64>,
}

/// Results-screen payload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FootprintReport {
    pub result: FootprintResult,
    pub status: ImpactStatus,
    pub status_label: String,
    pub impact: ImpactData,
    pub eco_profile: Option<String>,
    pub tips: Vec<ReductionTip>,
}

impl FootprintReport {
    pub fn new(result: FootprintResult, impact: ImpactData, eco_profile: Option<String>) -> Self {
        let status = ImpactStatus::for_tons(result.total_tons);
        Self {
            result,
            status,
            status_label: status.label().to_string(),
            impact,
            eco_profile,
            tips: REDUCTION_TIPS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HeatmapView {
    pub mode: HeatmapMode,
    pub date: NaiveDate,
    pub center: Coordinates,
    pub points: Vec<HeatmapPoint>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryView {
    pub base_date: NaiveDate,
    pub location_name: String,
    pub points: Vec<HistoryPoint>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchView {
    pub scope: Option<LookupScope>,
    pub query: String,
    pub candidates: Vec<GroundingCandidate>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MapView {
    pub selected: Coordinates,
    pub probing: bool,
    pub heatmap_mode: HeatmapMode,
    pub heatmap_date: NaiveDate,
    pub history_base_date: NaiveDate,
    pub weather: Option<WeatherSnapshot>,
}

/// Snapshot of a whole session, enough to render any screen.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionView {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub screen: Screen,
    pub bottom_nav_visible: bool,
    pub user: User,
    pub location: LocationData,
    pub theme: AqiTheme,
    pub impact: ImpactData,
    pub results: Option<FootprintResult>,
    pub eco_profile: Option<String>,
    pub emergency: EmergencyStatus,
    pub search: SearchView,
    pub map: MapView,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    state: RwLock<SessionState>,
    fence: RequestFence,
    probe: Mutex<Option<JoinHandle<()>>>,
    siren: Mutex<Option<Siren>>,
    /// When a client last reached this session through the registry.
    last_seen: Mutex<Instant>,
    services: Arc<SessionServices>,
}

/// The guarded values are plain handles, so a poisoned lock is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    pub fn new(user: User, services: Arc<SessionServices>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            state: RwLock::new(SessionState::new(user, now.date_naive())),
            fence: RequestFence::default(),
            probe: Mutex::new(None),
            siren: Mutex::new(None),
            last_seen: Mutex::new(Instant::now()),
            services,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Mark the session as used now.
    pub fn touch(&self) {
        *lock(&self.last_seen) = Instant::now();
    }

    /// Time since the last [`Session::touch`] (or creation).
    pub fn idle_for(&self) -> Duration {
        lock(&self.last_seen).elapsed()
    }

    pub async fn view(&self) -> SessionView {
        let state = self.state.read().await;
        SessionView {
            id: self.id,
            created_at: self.created_at,
            screen: state.screen,
            bottom_nav_visible: state.bottom_nav_visible(),
            user: state.user.clone(),
            location: state.location.clone(),
            theme: AqiTheme::for_aqi(state.location.aqi),
            impact: state.impact.clone(),
            results: state.results.clone(),
            eco_profile: state.eco_profile.clone(),
            emergency: self.emergency_status_of(&state),
            search: SearchView {
                scope: state.search.scope,
                query: state.search.query.clone(),
                candidates: state.search.candidates.clone(),
            },
            map: MapView {
                selected: state.map.selected,
                probing: state.map.probing,
                heatmap_mode: state.map.heatmap_mode,
                heatmap_date: state.map.heatmap_date,
                history_base_date: state.map.history_base_date,
                weather: state.map.weather.clone(),
            },
        }
    }

    pub async fn location(&self) -> LocationData {
        self.state.read().await.location.clone()
    }

    /// Direct assignment, no guards.
    pub async fn navigate(&self, screen: Screen) -> SessionView {
        {
            let mut state = self.state.write().await;
            tracing::debug!("Session {}: {:?} -> {:?}", self.id, state.screen, screen);
            state.screen = screen;
        }
        self.view().await
    }

    // --- location flows ---

    /// Apply a device position fix reported by the client.
    pub async fn locate_device(
        self: &Arc<Self>,
        scope: LookupScope,
        report: PositionReport,
    ) -> Result<LocationOutcome, AppError> {
        let coords = report.into_coordinates().inspect_err(|e| {
            tracing::warn!("Session {}: device fix failed: {}", self.id, e);
        })?;

        match scope {
            LookupScope::Dashboard => {
                let token = self.fence.begin();
                tokio::time::sleep(self.services.device_fix_latency).await;
                let metrics = self
                    .services
                    .metrics
                    .metrics(coords, MetricsProfile::DeviceFix)
                    .await?;
                let name = format!("Current Location ({:.2}, {:.2})", coords.lat, coords.lng);

                let mut state = self.state.write().await;
                let applied = self.commit_location(
                    &mut state,
                    token,
                    LocationData::from_metrics(name, coords, metrics),
                );
                if applied {
                    state.search.query.clear();
                    state.search.candidates.clear();
                }
                Ok(self.outcome(&state, applied, false, None))
            }
            LookupScope::Map => {
                self.map_select(coords, Some(MAP_FIX_NAME.to_string())).await;
                Ok(self.pending_outcome().await)
            }
            LookupScope::Calculator => {
                let mut state = self.state.write().await;
                let token = self.fence.begin();
                let grid = GridContext {
                    co2_factor: DEFAULT_CO2_FACTOR,
                    eco_profile: GPS_PROFILE.to_string(),
                };
                let applied = self.commit_grid(&mut state, token, GPS_NAME, Some(coords), grid);
                state.search.candidates.clear();
                Ok(self.outcome(&state, applied, false, None))
            }
        }
    }

    /// Grounded text search.
    ///
    /// Grounded places are offered as a disambiguation list. Without any, a
    /// parsed `COORDS:` is applied according to `scope`. A reply with neither
    /// changes nothing.
    pub async fn search(
        self: &Arc<Self>,
        scope: LookupScope,
        query: &str,
    ) -> Result<LocationOutcome, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::BadRequest("Search query must not be empty".to_string()));
        }
        let client = self.services.search.as_ref().ok_or_else(|| {
            AppError::ServiceUnavailable(
                "Place search is not configured (GEMINI_API_KEY is unset)".to_string(),
            )
        })?;

        let token = self.fence.begin();
        let reply = client
            .search(&search::build_prompt(scope, query))
            .await
            .inspect_err(|e| {
                tracing::warn!("Session {}: search for '{}' failed: {}", self.id, query, e);
            })?;

        let coords = search::parse_coordinates(&reply.text);
        let grid = (scope == LookupScope::Calculator).then(|| search::parse_grid_context(&reply.text));
        let candidates: Vec<GroundingCandidate> = reply
            .places
            .into_iter()
            .map(|place| GroundingCandidate {
                title: place
                    .title
                    .unwrap_or_else(|| search::untitled_place(scope).to_string()),
                uri: place.uri,
                lat: grid.as_ref().and(coords).map(|c| c.lat),
                lng: grid.as_ref().and(coords).map(|c| c.lng),
                co2_factor: grid.as_ref().map(|g| g.co2_factor),
                eco_profile: grid.as_ref().map(|g| g.eco_profile.clone()),
            })
            .collect();

        let mut state = self.state.write().await;
        if !self.fence.is_current(token) {
            return Ok(self.outcome(&state, false, false, Some(SUPERSEDED.to_string())));
        }
        state.search = SearchState {
            scope: Some(scope),
            query: query.to_string(),
            candidates,
        };

        if !state.search.candidates.is_empty() {
            tracing::debug!(
                "Session {}: '{}' returned {} candidates",
                self.id,
                query,
                state.search.candidates.len()
            );
            return Ok(self.outcome(&state, false, false, None));
        }

        let Some(coords) = coords else {
            tracing::debug!("Session {}: no coordinates in reply for '{}'", self.id, query);
            return Ok(self.outcome(
                &state,
                false,
                false,
                Some(format!("No location found for '{}'", query)),
            ));
        };

        match scope {
            LookupScope::Dashboard => {
                drop(state);
                let metrics = self
                    .services
                    .metrics
                    .metrics(coords, MetricsProfile::Search)
                    .await?;
                let mut state = self.state.write().await;
                let applied = self.commit_location(
                    &mut state,
                    token,
                    LocationData::from_metrics(query, coords, metrics),
                );
                Ok(self.outcome(&state, applied, false, None))
            }
            LookupScope::Map => {
                drop(state);
                self.map_select(coords, Some(query.to_string())).await;
                Ok(self.pending_outcome().await)
            }
            LookupScope::Calculator => {
                let grid = grid.unwrap_or_default();
                let applied = self.commit_grid(&mut state, token, query, Some(coords), grid);
                Ok(self.outcome(&state, applied, false, None))
            }
        }
    }

    /// Apply the disambiguation candidate at `index` from the last search.
    ///
    /// Calculator candidates carry their own coordinates; the others are
    /// forward-geocoded by title first.
    pub async fn select_candidate(
        self: &Arc<Self>,
        index: usize,
    ) -> Result<LocationOutcome, AppError> {
        let (token, scope, candidate) = {
            let mut state = self.state.write().await;
            let scope = state
                .search
                .scope
                .ok_or_else(|| AppError::NotFound("No search results to choose from".to_string()))?;
            let candidate = state.search.candidates.get(index).cloned().ok_or_else(|| {
                AppError::NotFound(format!("No search result at index {}", index))
            })?;
            let token = self.fence.begin();
            state.search.candidates.clear();
            state.search.query = candidate.title.clone();

            if scope == LookupScope::Calculator {
                let coords = match (candidate.lat, candidate.lng) {
                    (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
                    _ => None,
                };
                let grid = GridContext {
                    co2_factor: candidate
                        .co2_factor
                        .filter(|f| *f != 0.0)
                        .unwrap_or(DEFAULT_CO2_FACTOR),
                    eco_profile: candidate
                        .eco_profile
                        .clone()
                        .unwrap_or_else(|| CANDIDATE_FALLBACK_PROFILE.to_string()),
                };
                let applied = self.commit_grid(&mut state, token, &candidate.title, coords, grid);
                return Ok(self.outcome(&state, applied, false, None));
            }
            (token, scope, candidate)
        };

        let coords = self
            .services
            .geocoder
            .forward(&candidate.title)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    "Session {}: geocoding '{}' failed: {}",
                    self.id,
                    candidate.title,
                    e
                );
            })?;

        let Some(coords) = coords else {
            let state = self.state.read().await;
            return Ok(self.outcome(
                &state,
                false,
                false,
                Some(format!("Could not locate '{}'", candidate.title)),
            ));
        };

        if scope == LookupScope::Map {
            if !self.fence.is_current(token) {
                let state = self.state.read().await;
                return Ok(self.outcome(&state, false, false, Some(SUPERSEDED.to_string())));
            }
            self.map_select(coords, Some(candidate.title)).await;
            return Ok(self.pending_outcome().await);
        }

        let metrics = self
            .services
            .metrics
            .metrics(coords, MetricsProfile::Search)
            .await?;
        let mut state = self.state.write().await;
        let applied = self.commit_location(
            &mut state,
            token,
            LocationData::from_metrics(candidate.title, coords, metrics),
        );
        Ok(self.outcome(&state, applied, false, None))
    }

    /// Click or marker drag on a map.
    ///
    /// On the map screen this starts a probe; on the calculator it pins a
    /// manual grid context.
    pub async fn map_interaction(
        self: &Arc<Self>,
        scope: LookupScope,
        coords: Coordinates,
        name: Option<String>,
    ) -> Result<LocationOutcome, AppError> {
        let coords = validate_coordinates(coords.lat, coords.lng)?;
        match scope {
            LookupScope::Map => {
                self.map_select(coords, name).await;
                Ok(self.pending_outcome().await)
            }
            LookupScope::Calculator => {
                let mut state = self.state.write().await;
                let token = self.fence.begin();
                let grid = GridContext {
                    co2_factor: DEFAULT_CO2_FACTOR,
                    eco_profile: PIN_PROFILE.to_string(),
                };
                let name = name.unwrap_or_else(|| PIN_NAME.to_string());
                let applied = self.commit_grid(&mut state, token, &name, Some(coords), grid);
                Ok(self.outcome(&state, applied, false, None))
            }
            LookupScope::Dashboard => Err(AppError::BadRequest(
                "The dashboard has no map; use scope 'map' or 'calculator'".to_string(),
            )),
        }
    }

    /// Select a map coordinate now and probe it after the probe latency.
    ///
    /// Supersedes every outstanding location request and aborts the previous
    /// probe task.
    pub async fn map_select(self: &Arc<Self>, coords: Coordinates, name: Option<String>) {
        let token = self.fence.begin();
        {
            let mut state = self.state.write().await;
            state.map.selected = coords;
            state.map.probing = true;
            state.map.spinner_token = Some(token);
        }

        let session = Arc::clone(self);
        let task = tokio::spawn(async move {
            futures::join!(
                session.probe_metrics(token, coords, name),
                session.probe_weather(token, coords)
            );
        });
        if let Some(previous) = lock(&self.probe).replace(task) {
            previous.abort();
        }
    }

    async fn probe_metrics(&self, token: RequestToken, coords: Coordinates, name: Option<String>) {
        tokio::time::sleep(self.services.probe_latency).await;
        let metrics = self
            .services
            .metrics
            .metrics(coords, MetricsProfile::MapProbe)
            .await;

        let mut state = self.state.write().await;
        // A newer map selection owns the spinner; any other flow leaves it to us.
        if state.map.spinner_token == Some(token) {
            state.map.probing = false;
            state.map.spinner_token = None;
        }
        if !self.fence.is_current(token) {
            tracing::debug!("Session {}: dropping superseded probe #{}", self.id, token.generation());
            return;
        }
        match metrics {
            Ok(metrics) => {
                let name = name
                    .unwrap_or_else(|| format!("Coords: {:.4}, {:.4}", coords.lat, coords.lng));
                let location = LocationData::from_metrics(name, coords, metrics);
                if self.commit_location(&mut state, token, location) {
                    if let Err(e) = state.regenerate_history() {
                        tracing::warn!("Session {}: history not regenerated: {}", self.id, e);
                    }
                }
            }
            Err(e) => tracing::warn!("Session {}: map probe failed: {}", self.id, e),
        }
    }

    async fn probe_weather(&self, token: RequestToken, coords: Coordinates) {
        let weather = self.services.weather.fetch_current(coords).await;
        let mut state = self.state.write().await;
        if !self.fence.is_current(token) {
            return;
        }
        match weather {
            Ok(snapshot) => state.map.weather = Some(snapshot),
            Err(e) => tracing::warn!("Session {}: weather fetch failed: {}", self.id, e),
        }
    }

    // --- footprint ---

    pub async fn set_impact(&self, impact: ImpactData) -> ImpactData {
        let mut state = self.state.write().await;
        state.impact = impact;
        state.impact.clone()
    }

    /// Calculate from `impact` (or the stored inputs), store the result and
    /// move to the Results screen.
    pub async fn calculate_footprint(&self, impact: Option<ImpactData>) -> FootprintReport {
        let mut state = self.state.write().await;
        if let Some(impact) = impact {
            state.impact = impact;
        }
        let result = footprint::calculate(&state.impact);
        tracing::info!("Session {}: footprint {} t/yr", self.id, result.total_tons);
        state.results = Some(result.clone());
        state.screen = Screen::Results;
        FootprintReport::new(result, state.impact.clone(), state.eco_profile.clone())
    }

    pub async fn footprint(&self) -> Result<FootprintReport, AppError> {
        let state = self.state.read().await;
        let result = state
            .results
            .clone()
            .ok_or_else(|| AppError::NotFound("No footprint has been calculated yet".to_string()))?;
        Ok(FootprintReport::new(
            result,
            state.impact.clone(),
            state.eco_profile.clone(),
        ))
    }

    // --- emergency ---

    pub async fn emergency(&self) -> EmergencyStatus {
        let state = self.state.read().await;
        self.emergency_status_of(&state)
    }

    pub async fn engage_emergency(&self) -> EmergencyStatus {
        let mut state = self.state.write().await;
        if state.emergency.engage() {
            self.start_siren();
        }
        self.emergency_status_of(&state)
    }

    pub async fn dismiss_emergency(&self, action: DismissAction) -> EmergencyStatus {
        let mut state = self.state.write().await;
        if state.emergency.dismiss(action) {
            self.stop_siren();
        }
        self.emergency_status_of(&state)
    }

    // --- map view ---

    pub async fn heatmap(&self) -> HeatmapView {
        let state = self.state.read().await;
        heatmap_view(&state)
    }

    pub async fn cycle_heatmap(&self) -> HeatmapView {
        let mut state = self.state.write().await;
        state.map.heatmap_mode = state.map.heatmap_mode.next();
        heatmap_view(&state)
    }

    pub async fn set_heatmap_date(&self, date: NaiveDate) -> HeatmapView {
        let mut state = self.state.write().await;
        state.map.heatmap_date = date;
        heatmap_view(&state)
    }

    pub async fn history(&self) -> HistoryView {
        let state = self.state.read().await;
        history_view(&state)
    }

    /// Rebuild the history ending at `date`. Dates too close to the
    /// calendar's lower bound are rejected and leave the history unchanged.
    pub async fn set_history_base_date(&self, date: NaiveDate) -> Result<HistoryView, AppError> {
        let mut state = self.state.write().await;
        let history = state.history_for(date)?;
        state.map.history_base_date = date;
        state.map.history = history;
        Ok(history_view(&state))
    }

    /// Fetch current weather at the selected map coordinate.
    pub async fn refresh_weather(&self) -> Result<WeatherSnapshot, AppError> {
        let coords = self.state.read().await.map.selected;
        let snapshot = self.services.weather.fetch_current(coords).await?;

        let mut state = self.state.write().await;
        // A newer selection owns the weather slot.
        if state.map.selected == coords {
            state.map.weather = Some(snapshot.clone());
        }
        Ok(snapshot)
    }

    // --- lifecycle ---

    /// Abort pending work and silence the siren. Outstanding requests become
    /// stale and will not commit.
    pub fn teardown(&self) {
        self.fence.invalidate();
        if let Some(probe) = lock(&self.probe).take() {
            probe.abort();
        }
        self.stop_siren();
        tracing::info!("Session {} torn down", self.id);
    }

    // --- internals ---

    /// Replace the location if `token` is still current. Returns whether it did.
    fn commit_location(
        &self,
        state: &mut SessionState,
        token: RequestToken,
        location: LocationData,
    ) -> bool {
        if !self.fence.is_current(token) {
            tracing::debug!(
                "Session {}: dropping superseded update #{} ({})",
                self.id,
                token.generation(),
                location.name
            );
            return false;
        }
        tracing::info!(
            "Session {}: location -> {} (aqi {}, {:?})",
            self.id,
            location.name,
            location.aqi,
            location.category()
        );
        state.location = location;
        if state.emergency.observe(state.location.aqi) {
            self.start_siren();
        }
        true
    }

    /// Apply a calculator grid context: fixed readings, the grid's emission
    /// factor and eco profile.
    fn commit_grid(
        &self,
        state: &mut SessionState,
        token: RequestToken,
        name: &str,
        coords: Option<Coordinates>,
        grid: GridContext,
    ) -> bool {
        let location = LocationData {
            name: name.to_string(),
            lat: coords.map(|c| c.lat),
            lng: coords.map(|c| c.lng),
            aqi: GRID_AQI,
            pm25: GRID_PM25,
            no2: GRID_NO2,
            carbon_intensity: None,
        };
        if !self.commit_location(state, token, location) {
            return false;
        }
        state.impact.co2_rate = grid.co2_factor;
        state.eco_profile = Some(grid.eco_profile);
        state.search.query = name.to_string();
        true
    }

    fn outcome(
        &self,
        state: &SessionState,
        applied: bool,
        pending: bool,
        message: Option<String>,
    ) -> LocationOutcome {
        LocationOutcome {
            applied,
            pending,
            candidates: state.search.candidates.clone(),
            location: state.location.clone(),
            emergency: state.emergency.state(),
            co2_rate: state.impact.co2_rate,
            eco_profile: state.eco_profile.clone(),
            message,
        }
    }

    async fn pending_outcome(&self) -> LocationOutcome {
        let state = self.state.read().await;
        self.outcome(&state, false, true, None)
    }

    fn emergency_status_of(&self, state: &SessionState) -> EmergencyStatus {
        let siren = lock(&self.siren);
        EmergencyStatus {
            state: state.emergency.state(),
            cause: state.emergency.cause(),
            trigger_aqi: state.emergency.trigger_aqi(),
            since: state.emergency.since(),
            current_aqi: state.location.aqi,
            location_name: state.location.name.clone(),
            siren_active: siren.as_ref().is_some_and(Siren::is_running),
            siren_frequency_hz: siren.as_ref().map(Siren::frequency_hz),
            siren_cycles: siren.as_ref().map(Siren::cycles),
        }
    }

    fn start_siren(&self) {
        let mut siren = lock(&self.siren);
        if siren.is_none() {
            *siren = Some(Siren::start(self.id));
        }
    }

    fn stop_siren(&self) {
        if lock(&self.siren).take().is_some() {
            tracing::debug!("Siren stopped for session {}", self.id);
        }
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let probe = self.probe.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = probe.take() {
            task.abort();
        }
    }
}

fn heatmap_view(state: &SessionState) -> HeatmapView {
    HeatmapView {
        mode: state.map.heatmap_mode,
        date: state.map.heatmap_date,
        center: state.map.selected,
        points: generate_heatmap(
            state.map.heatmap_mode,
            state.map.heatmap_date,
            state.map.selected,
        ),
    }
}

fn history_view(state: &SessionState) -> HistoryView {
    HistoryView {
        base_date: state.map.history_base_date,
        location_name: state.location.name.clone(),
        points: state.map.history.clone(),
    }
}
