//! Unit catalog endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::parse_uuid;
use crate::api::reports::ReportListResponse;
use crate::db;
use crate::error::ApiResult;
use crate::AppState;
use pollwatch_common::models::ElectionUnit;

#[derive(Debug, Serialize)]
pub struct UnitListResponse {
    pub units: Vec<ElectionUnit>,
}

/// GET /api/units
pub async fn list_units(State(state): State<AppState>) -> ApiResult<Json<UnitListResponse>> {
    let units = db::units::list_units(&state.db).await?;
    Ok(Json(UnitListResponse { units }))
}

/// GET /api/units/:id
pub async fn get_unit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ElectionUnit>> {
    let id = parse_uuid(&id)?;
    let unit = db::units::get_unit(&state.db, id).await?;
    Ok(Json(unit))
}

/// GET /api/units/:id/reports
///
/// The unit's reports, newest first. Unknown units are 404, not an empty
/// list.
pub async fn unit_reports(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ReportListResponse>> {
    let id = parse_uuid(&id)?;
    db::units::get_unit(&state.db, id).await?;
    let reports = db::reports::list_reports_for_unit(&state.db, id).await?;
    Ok(Json(ReportListResponse { reports }))
}

/// Build unit catalog routes
pub fn unit_routes() -> Router<AppState> {
    Router::new()
        .route("/api/units", get(list_units))
        .route("/api/units/:id", get(get_unit))
        .route("/api/units/:id/reports", get(unit_reports))
}
