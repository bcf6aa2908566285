//! Dashboard endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::db;
use crate::error::ApiResult;
use crate::stats::{compute_stats, DashboardStats};
use crate::AppState;

/// GET /api/dashboard
///
/// Recomputed from the live tables on every request.
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardStats>> {
    let units = db::units::list_units(&state.db).await?;
    let reports = db::reports::list_reports(&state.db).await?;
    Ok(Json(compute_stats(&units, &reports)))
}

/// Build dashboard routes
pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/api/dashboard", get(dashboard))
}
