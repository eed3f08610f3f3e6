//! Carbon footprint endpoints.
//!
//! - POST /api/v1/footprint (stateless)
//! - PUT  /api/v1/sessions/:id/impact
//! - POST /api/v1/sessions/:id/footprint
//! - GET  /api/v1/sessions/:id/footprint

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, ErrorResponse};
use crate::models::ImpactData;
use crate::services::footprint;
use crate::services::registry::SharedRegistry;
use crate::services::session::FootprintReport;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CalculateRequest {
    /// Replaces the stored inputs before calculating; the stored inputs are
    /// used when omitted
    #[serde(default)]
    pub impact: Option<ImpactData>,
}

/// Calculate a footprint without a session.
#[utoipa::path(
    post,
    path = "/api/v1/footprint",
    tag = "Footprint",
    request_body = ImpactData,
    responses(
        (status = 200, description = "Estimated yearly footprint", body = FootprintReport),
    )
)]
pub async fn calculate_footprint(Json(impact): Json<ImpactData>) -> Json<FootprintReport> {
    let result = footprint::calculate(&impact);
    Json(FootprintReport::new(result, impact, None))
}

#[utoipa::path(
    put,
    path = "/api/v1/sessions/{id}/impact",
    tag = "Footprint",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    request_body = ImpactData,
    responses(
        (status = 200, description = "Stored calculator inputs", body = ImpactData),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn set_impact(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
    Json(impact): Json<ImpactData>,
) -> Result<Json<ImpactData>, AppError> {
    let session = registry.get(id).await?;
    Ok(Json(session.set_impact(impact).await))
}

/// Calculate, store the result and move the session to the Results screen.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/footprint",
    tag = "Footprint",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    request_body = CalculateRequest,
    responses(
        (status = 200, description = "Estimated yearly footprint", body = FootprintReport),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn calculate_session_footprint(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
    Json(req): Json<CalculateRequest>,
) -> Result<Json<FootprintReport>, AppError> {
    let session = registry.get(id).await?;
    Ok(Json(session.calculate_footprint(req.impact).await))
}

#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}/footprint",
    tag = "Footprint",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 200, description = "Last calculated footprint", body = FootprintReport),
        (status = 404, description = "Session not found or nothing calculated yet", body = ErrorResponse),
    )
)]
pub async fn get_session_footprint(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
) -> Result<Json<FootprintReport>, AppError> {
    let session = registry.get(id).await?;
    Ok(Json(session.footprint().await?))
}
