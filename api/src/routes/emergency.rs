use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, ErrorResponse};
use crate::services::emergency::DismissAction;
use crate::services::registry::SharedRegistry;
use crate::services::session::EmergencyStatus;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DismissRequest {
    pub action: DismissAction,
}

#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}/emergency",
    tag = "Emergency",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 200, description = "Trigger state and siren status", body = EmergencyStatus),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn get_emergency(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
) -> Result<Json<EmergencyStatus>, AppError> {
    let session = registry.get(id).await?;
    Ok(Json(session.emergency().await))
}

/// Latch the trigger by hand. No-op while already alerting.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/emergency/engage",
    tag = "Emergency",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 200, description = "Trigger state after engaging", body = EmergencyStatus),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn engage_emergency(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
) -> Result<Json<EmergencyStatus>, AppError> {
    let session = registry.get(id).await?;
    Ok(Json(session.engage_emergency().await))
}

/// Clear the trigger and stop the siren.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/emergency/dismiss",
    tag = "Emergency",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    request_body = DismissRequest,
    responses(
        (status = 200, description = "Trigger state after dismissal", body = EmergencyStatus),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn dismiss_emergency(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
    Json(req): Json<DismissRequest>,
) -> Result<Json<EmergencyStatus>, AppError> {
    let session = registry.get(id).await?;
    Ok(Json(session.dismiss_emergency(req.action).await))
}
