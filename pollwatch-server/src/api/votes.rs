//! Community voting endpoints

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::api::parse_uuid;
use crate::db;
use crate::error::ApiResult;
use crate::AppState;
use pollwatch_common::models::{Vote, VoteAggregate};

#[derive(Debug, Deserialize)]
pub struct VoteBody {
    pub voter_id: String,
    pub rating: i64,
}

/// POST /api/reports/:id/votes
///
/// Rate a report's credibility 1-5. One rating per voter; re-rating
/// overwrites.
pub async fn cast_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<VoteBody>,
) -> ApiResult<Json<Vote>> {
    let report_id = parse_uuid(&id)?;
    let vote = db::votes::upsert_vote(&state.db, report_id, &body.voter_id, body.rating).await?;
    Ok(Json(vote))
}

/// GET /api/reports/:id/votes
pub async fn vote_aggregate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<VoteAggregate>> {
    let report_id = parse_uuid(&id)?;
    let aggregate = db::votes::get_aggregate(&state.db, report_id).await?;
    Ok(Json(aggregate))
}

/// Build voting routes
pub fn vote_routes() -> Router<AppState> {
    Router::new().route("/api/reports/:id/votes", post(cast_vote).get(vote_aggregate))
}
