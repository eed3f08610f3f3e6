//! Location acquisition endpoints.
//!
//! - GET  /api/v1/sessions/:id/location
//! - POST /api/v1/sessions/:id/location/device
//! - POST /api/v1/sessions/:id/location/search
//! - POST /api/v1/sessions/:id/location/candidates/:index
//! - POST /api/v1/sessions/:id/location/map

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, ErrorResponse};
use crate::models::{Coordinates, LocationData};
use crate::services::registry::SharedRegistry;
use crate::services::search::LookupScope;
use crate::services::session::{LocationOutcome, PositionReport};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeviceFixRequest {
    /// Screen the fix was requested from
    pub scope: LookupScope,
    /// Outcome of the platform position request
    pub position: PositionReport,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchRequest {
    pub scope: LookupScope,
    /// Free-text place query
    pub query: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MapClickRequest {
    /// `map` probes the point; `calculator` pins a manual grid context
    pub scope: LookupScope,
    pub lat: f64,
    pub lng: f64,
    /// Display name; defaults to a coordinate label (map) or "Pinned Location"
    #[serde(default)]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}/location",
    tag = "Location",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 200, description = "Current location", body = LocationData),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn get_location(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
) -> Result<Json<LocationData>, AppError> {
    let session = registry.get(id).await?;
    Ok(Json(session.location().await))
}

/// Apply a device position fix.
///
/// On the dashboard the fix resolves after the device-fix latency; on the
/// map it starts a probe named "My Location"; on the calculator it applies a
/// GPS grid context immediately.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/location/device",
    tag = "Location",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    request_body = DeviceFixRequest,
    responses(
        (status = 200, description = "Fix applied, superseded, or probe pending", body = LocationOutcome),
        (status = 400, description = "Coordinates out of range", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 422, description = "Geolocation unsupported or failed", body = ErrorResponse),
    )
)]
pub async fn locate_device(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
    Json(req): Json<DeviceFixRequest>,
) -> Result<Json<LocationOutcome>, AppError> {
    let session = registry.get(id).await?;
    let outcome = session.locate_device(req.scope, req.position).await?;
    Ok(Json(outcome))
}

/// Grounded text search.
///
/// Returns a disambiguation list when the answer cites map places. An
/// unparseable answer is `applied: false` with no candidates.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/location/search",
    tag = "Location",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Search outcome", body = LocationOutcome),
        (status = 400, description = "Empty query", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 502, description = "Search service failed", body = ErrorResponse),
        (status = 503, description = "Search is not configured", body = ErrorResponse),
    )
)]
pub async fn search(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<LocationOutcome>, AppError> {
    let session = registry.get(id).await?;
    let outcome = session.search(req.scope, &req.query).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/location/candidates/{index}",
    tag = "Location",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
        ("index" = usize, Path, description = "Position in the last search's candidate list"),
    ),
    responses(
        (status = 200, description = "Candidate applied or probe pending", body = LocationOutcome),
        (status = 404, description = "Session or candidate not found", body = ErrorResponse),
        (status = 502, description = "Geocoding failed", body = ErrorResponse),
    )
)]
pub async fn select_candidate(
    State(registry): State<SharedRegistry>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<LocationOutcome>, AppError> {
    let session = registry.get(id).await?;
    let outcome = session.select_candidate(index).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/location/map",
    tag = "Location",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    request_body = MapClickRequest,
    responses(
        (status = 200, description = "Probe pending or pin applied", body = LocationOutcome),
        (status = 400, description = "Invalid coordinates or scope", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn map_click(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
    Json(req): Json<MapClickRequest>,
) -> Result<Json<LocationOutcome>, AppError> {
    let session = registry.get(id).await?;
    let outcome = session
        .map_interaction(req.scope, Coordinates::new(req.lat, req.lng), req.name)
        .await?;
    Ok(Json(outcome))
}
