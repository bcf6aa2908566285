//! pollwatch-server library interface
//!
//! Exposes the router, state, and services for integration testing.

pub mod api;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod services;
pub mod stats;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::classifier::Classifier;
use crate::services::MediaStore;

/// Request body ceiling; leaves room for several media files per
/// submission on top of the per-file cap
const MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Classification backend, selected once at startup
    pub classifier: Arc<dyn Classifier>,
    /// Media attachment storage
    pub media_store: MediaStore,
    /// Budget for one classifier call
    pub classify_timeout: Duration,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        classifier: Arc<dyn Classifier>,
        media_store: MediaStore,
        classify_timeout: Duration,
    ) -> Self {
        Self {
            db,
            classifier,
            media_store,
            classify_timeout,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Record an error for the health endpoint's diagnostics
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
///
/// Stored media is served statically under /media, matching the URLs the
/// media store hands out.
pub fn build_router(state: AppState) -> Router {
    let media_dir = state.media_store.media_dir().to_path_buf();

    Router::new()
        .merge(api::report_routes())
        .merge(api::vote_routes())
        .merge(api::unit_routes())
        .merge(api::classify_routes())
        .merge(api::dashboard_routes())
        .merge(api::health_routes())
        .nest_service("/media", ServeDir::new(media_dir))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
