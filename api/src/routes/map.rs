//! Map screen endpoints: heatmap overlay, history chart and weather.
//!
//! - GET  /api/v1/sessions/:id/map/heatmap
//! - POST /api/v1/sessions/:id/map/heatmap/cycle
//! - PUT  /api/v1/sessions/:id/map/heatmap/date
//! - GET  /api/v1/sessions/:id/map/history
//! - PUT  /api/v1/sessions/:id/map/history/base-date
//! - GET  /api/v1/sessions/:id/map/weather

use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, ErrorResponse};
use crate::models::WeatherSnapshot;
use crate::services::registry::SharedRegistry;
use crate::services::session::{HeatmapView, HistoryView};

#[derive(Debug, Deserialize, ToSchema)]
pub struct DateRequest {
    /// Calendar date, e.g. "2026-10-16"
    pub date: NaiveDate,
}

#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}/map/heatmap",
    tag = "Map",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 200, description = "Heatmap points around the selected coordinate", body = HeatmapView),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn get_heatmap(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
) -> Result<Json<HeatmapView>, AppError> {
    let session = registry.get(id).await?;
    Ok(Json(session.heatmap().await))
}

/// Advance the overlay mode: off, live, historical, off.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/map/heatmap/cycle",
    tag = "Map",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 200, description = "Heatmap in the next mode", body = HeatmapView),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn cycle_heatmap(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
) -> Result<Json<HeatmapView>, AppError> {
    let session = registry.get(id).await?;
    Ok(Json(session.cycle_heatmap().await))
}

/// Date seeding the historical overlay.
#[utoipa::path(
    put,
    path = "/api/v1/sessions/{id}/map/heatmap/date",
    tag = "Map",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    request_body = DateRequest,
    responses(
        (status = 200, description = "Heatmap for the new date", body = HeatmapView),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn set_heatmap_date(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
    Json(req): Json<DateRequest>,
) -> Result<Json<HeatmapView>, AppError> {
    let session = registry.get(id).await?;
    Ok(Json(session.set_heatmap_date(req.date).await))
}

#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}/map/history",
    tag = "Map",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 200, description = "Seven-day history ending at the base date", body = HistoryView),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn get_history(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryView>, AppError> {
    let session = registry.get(id).await?;
    Ok(Json(session.history().await))
}

#[utoipa::path(
    put,
    path = "/api/v1/sessions/{id}/map/history/base-date",
    tag = "Map",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    request_body = DateRequest,
    responses(
        (status = 200, description = "History regenerated for the new base date", body = HistoryView),
        (status = 400, description = "Base date too early to build a seven-day series", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn set_history_base_date(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
    Json(req): Json<DateRequest>,
) -> Result<Json<HistoryView>, AppError> {
    let session = registry.get(id).await?;
    Ok(Json(session.set_history_base_date(req.date).await?))
}

/// Current weather at the selected map coordinate.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}/map/weather",
    tag = "Map",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 200, description = "Current conditions", body = WeatherSnapshot),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 502, description = "Open-Meteo unreachable", body = ErrorResponse),
    )
)]
pub async fn get_weather(
    State(registry): State<SharedRegistry>,
    Path(id): Path<Uuid>,
) -> Result<Json<WeatherSnapshot>, AppError> {
    let session = registry.get(id).await?;
    Ok(Json(session.refresh_weather().await?))
}
