//! Standalone classification endpoints
//!
//! These expose the classifier directly so the submission form can show a
//! live preview before the report is filed. Both endpoints degrade instead
//! of erroring when the backend is down.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::classifier::{classify_or_fallback, ReportContext, FALLBACK_CATEGORY};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use pollwatch_common::models::{Classification, LocationGuess};

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub description: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub existing_reports: Vec<ExistingReportBody>,
}

#[derive(Debug, Deserialize)]
pub struct ExistingReportBody {
    pub id: Uuid,
    #[serde(default)]
    pub category: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    #[serde(flatten)]
    pub classification: Classification,
    /// True when the fixed fallback produced this result
    pub fallback: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExtractLocationRequest {
    pub image_url: String,
}

/// POST /api/classify
pub async fn classify(
    State(state): State<AppState>,
    Json(body): Json<ClassifyRequest>,
) -> ApiResult<Json<ClassifyResponse>> {
    let description = body.description.trim();
    if description.is_empty() {
        return Err(ApiError::BadRequest(
            "description must not be empty".to_string(),
        ));
    }

    let existing: Vec<ReportContext> = body
        .existing_reports
        .into_iter()
        .map(|r| ReportContext {
            id: r.id,
            category: if r.category.is_empty() {
                FALLBACK_CATEGORY.to_string()
            } else {
                r.category
            },
            description: r.description,
        })
        .collect();

    let (classification, fallback) = classify_or_fallback(
        state.classifier.as_ref(),
        description,
        &body.image_urls,
        &existing,
        state.classify_timeout,
    )
    .await;

    Ok(Json(ClassifyResponse {
        classification,
        fallback,
    }))
}

/// POST /api/extract-location
///
/// Best-effort read of province/district/unit number off a polling place
/// sign photo. Failure is a zero-confidence guess, never an error.
pub async fn extract_location(
    State(state): State<AppState>,
    Json(body): Json<ExtractLocationRequest>,
) -> ApiResult<Json<LocationGuess>> {
    let image_url = body.image_url.trim();
    if image_url.is_empty() {
        return Err(ApiError::BadRequest(
            "image_url must not be empty".to_string(),
        ));
    }

    let guess = match tokio::time::timeout(
        state.classify_timeout,
        state.classifier.extract_location(image_url),
    )
    .await
    {
        Ok(Ok(guess)) => guess,
        Ok(Err(e)) => {
            warn!(backend = state.classifier.name(), "Location extraction failed: {}", e);
            no_guess()
        }
        Err(_) => {
            warn!(backend = state.classifier.name(), "Location extraction timed out");
            no_guess()
        }
    };

    Ok(Json(guess))
}

fn no_guess() -> LocationGuess {
    LocationGuess {
        province: None,
        district: None,
        unit_number: None,
        confidence: 0.0,
    }
}

/// Build classification routes
pub fn classify_routes() -> Router<AppState> {
    Router::new()
        .route("/api/classify", post(classify))
        .route("/api/extract-location", post(extract_location))
}
