//! HTTP API handlers for pollwatch-server

pub mod classify;
pub mod dashboard;
pub mod health;
pub mod reports;
pub mod units;
pub mod votes;

pub use classify::classify_routes;
pub use dashboard::dashboard_routes;
pub use health::health_routes;
pub use reports::report_routes;
pub use units::unit_routes;
pub use votes::vote_routes;

use crate::error::ApiError;
use uuid::Uuid;

/// Parse an id from a path or query string, keeping the JSON error body on
/// failure instead of the extractor's plain-text rejection
pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid id: {}", raw)))
}
