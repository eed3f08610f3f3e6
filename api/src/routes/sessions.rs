//! Session lifecycle and navigation endpoints.
//!
//! - POST   /api/v1/sessions
//! - GET    /api/v1/sessions/:id
//! - DELETE /api/v1/sessions/:id
//! - PUT    /api/v1/sessions/:id/screen

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, ErrorResponse};
use crate::models::{Screen, User};
use crate::services::registry::SharedRegistry;
use crate::services::session::SessionView;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Signed-in user; a guest when omitted
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NavigateRequest {
    pub screen: Screen,
}

/// Start a session at the dashboard with the default location.
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    tag = "Sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = SessionView),
    )
)]
pub async fn create_session(
    State(registry): State<SharedRegistry>,
    Json(req): Json<CreateSessionRequest>,
) -> (StatusCode, Json<SessionView>) {
    let session = registry.create(req.user.unwrap_or_default()).await;
    (StatusCode::CREATED, Json(session.view().await))
}

#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}",
    tag = "Sessions",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 200, description = "Full session snapshot", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn get_session(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = registry.get(id).await?;
    Ok(Json(session.view().await))
}

/// End a session. Pending probes are aborted and the siren stops.
#[utoipa::path(
    delete,
    path = "/api/v1/sessions/{id}",
    tag = "Sessions",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 204, description = "Session removed"),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn delete_session(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    registry.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/v1/sessions/{id}/screen",
    tag = "Sessions",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    request_body = NavigateRequest,
    responses(
        (status = 200, description = "Session after navigation", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn navigate(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
    Json(req): Json<NavigateRequest>,
) -> Result<Json<SessionView>, AppError> {
    let session = registry.get(id).await?;
    Ok(Json(session.navigate(req.screen).await))
}
