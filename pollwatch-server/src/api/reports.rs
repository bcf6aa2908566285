//! Report submission and moderation endpoints
//!
//! Submission is multipart: text fields plus repeated `media` file parts.
//! The whole pipeline is validate, store media, classify, persist; only
//! the persist step takes the write lock, and it runs on a detached task
//! so a dropped connection cannot leave a half-applied write.

use axum::{
    extract::{Multipart, Path, Query, State},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::parse_uuid;
use crate::classifier::{classify_or_fallback, ReportContext, SimilarCandidate};
use crate::db;
use crate::db::reports::NewReport;
use crate::error::{ApiError, ApiResult};
use crate::services::exif_dates;
use crate::services::media_store::{is_supported_content_type, MAX_UPLOAD_BYTES};
use crate::AppState;
use pollwatch_common::models::{
    Classification, ElectionUnit, MediaRef, MediaType, Report, ReportStatus, Severity,
};

#[derive(Debug, Serialize)]
pub struct ReportListResponse {
    pub reports: Vec<Report>,
}

#[derive(Debug, Serialize)]
pub struct CreateReportResponse {
    pub report: Report,
    /// Advisory classification; the stored severity is the reporter's
    pub classification: Classification,
    /// True when the classification is the fixed fallback
    pub fallback: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    pub unit_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

/// One buffered upload from the multipart body
struct UploadedFile {
    file_name: String,
    content_type: String,
    data: axum::body::Bytes,
}

/// Parsed multipart submission before validation
#[derive(Default)]
struct Submission {
    unit_id: Option<String>,
    description: Option<String>,
    severity: Option<String>,
    incident_time: Option<String>,
    files: Vec<UploadedFile>,
}

async fn read_submission(mut multipart: Multipart) -> Result<Submission, ApiError> {
    let mut submission = Submission::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "unit_id" => submission.unit_id = Some(read_text(field).await?),
            "description" => submission.description = Some(read_text(field).await?),
            "severity" => submission.severity = Some(read_text(field).await?),
            "incident_time" => submission.incident_time = Some(read_text(field).await?),
            "media" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();

                // Reject before buffering anything
                if !is_supported_content_type(&content_type) {
                    return Err(ApiError::BadRequest(format!(
                        "Unsupported media type '{}': only image/* and video/* are accepted",
                        content_type
                    )));
                }

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
                if data.len() > MAX_UPLOAD_BYTES {
                    return Err(ApiError::BadRequest(format!(
                        "Media file too large: {} bytes (limit {} bytes)",
                        data.len(),
                        MAX_UPLOAD_BYTES
                    )));
                }

                submission.files.push(UploadedFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            other => {
                warn!("Ignoring unknown multipart field '{}'", other);
            }
        }
    }

    Ok(submission)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart field: {}", e)))
}

/// POST /api/reports
///
/// Create a report from a multipart submission. Classification is
/// advisory and fail-soft: a dead or slow classifier degrades to the
/// fixed fallback without failing the submission. Media storage failure
/// is a 503 and the submission can be retried.
pub async fn create_report(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<CreateReportResponse>> {
    let submission = read_submission(multipart).await?;

    let unit_id = submission
        .unit_id
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("Missing field: unit_id".to_string()))?;
    let unit_id = parse_uuid(unit_id)?;

    let description = submission
        .description
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    if description.is_empty() {
        return Err(ApiError::BadRequest(
            "Missing field: description".to_string(),
        ));
    }
    let description = description.to_string();

    let severity = submission
        .severity
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("Missing field: severity".to_string()))?
        .parse::<Severity>()?;

    let mut incident_time = parse_incident_time(submission.incident_time.as_deref())?;

    // 404 before any media hits disk
    let unit = db::units::get_unit(&state.db, unit_id).await?;

    // Photo EXIF stands in for a missing incident time
    if incident_time.is_none() {
        incident_time = submission
            .files
            .iter()
            .filter(|f| MediaType::from_content_type(&f.content_type) == MediaType::Image)
            .find_map(|f| exif_dates::extract_captured_at(&f.data));
    }

    let mut media = Vec::with_capacity(submission.files.len());
    for file in &submission.files {
        let stored = match state
            .media_store
            .store(&file.file_name, &file.content_type, &file.data)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                state
                    .record_error(format!("Media store failed: {}", e))
                    .await;
                return Err(e.into());
            }
        };
        media.push(stored);
    }

    let existing = db::reports::list_reports_for_unit(&state.db, unit_id).await?;
    let context: Vec<ReportContext> = existing
        .iter()
        .map(|r| ReportContext {
            id: r.id,
            category: r
                .ai_category
                .clone()
                .unwrap_or_else(|| crate::classifier::FALLBACK_CATEGORY.to_string()),
            description: r.description.clone(),
        })
        .collect();
    let image_urls: Vec<String> = media
        .iter()
        .filter(|m| m.media_type == MediaType::Image)
        .map(|m| m.url.clone())
        .collect();

    let (classification, fallback) = classify_or_fallback(
        state.classifier.as_ref(),
        &description,
        &image_urls,
        &context,
        state.classify_timeout,
    )
    .await;

    let duplicate_of = if classification.possible_duplicate && !fallback && !existing.is_empty() {
        resolve_duplicate(&state, &description, &unit, &existing).await
    } else {
        None
    };

    let new = NewReport {
        unit_id,
        description,
        severity,
        media,
        incident_time,
        ai_category: Some(classification.category.clone()),
        ai_summary: Some(classification.summary.clone()),
        duplicate_of,
    };

    // Detached task: a client disconnect aborts the handler future, not
    // the insert-plus-recompute transaction
    let pool = state.db.clone();
    let persisted = tokio::spawn(async move { db::reports::create_report(&pool, new).await })
        .await
        .map_err(|e| ApiError::Internal(format!("Persist task failed: {}", e)))?;
    let report = match persisted {
        Ok(report) => report,
        Err(e) => {
            state
                .record_error(format!("Report persist failed: {}", e))
                .await;
            return Err(e.into());
        }
    };

    info!(
        report_id = %report.id,
        unit_id = %report.unit_id,
        severity = %report.severity,
        fallback,
        "Report created"
    );

    Ok(Json(CreateReportResponse {
        report,
        classification,
        fallback,
    }))
}

fn parse_incident_time(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => {
            let parsed = DateTime::parse_from_rfc3339(s).map_err(|_| {
                ApiError::BadRequest(format!("Invalid incident_time (expected RFC3339): {}", s))
            })?;
            Ok(Some(parsed.with_timezone(&Utc)))
        }
    }
}

/// Ask the classifier which existing report this one duplicates. Advisory
/// and fail-soft; any error or timeout means no link.
async fn resolve_duplicate(
    state: &AppState,
    description: &str,
    unit: &ElectionUnit,
    existing: &[Report],
) -> Option<Uuid> {
    let location = format!(
        "{} {} หน่วย {}",
        unit.province, unit.district, unit.unit_number
    );
    let candidates: Vec<SimilarCandidate> = existing
        .iter()
        .map(|r| SimilarCandidate {
            id: r.id,
            location: location.clone(),
            description: r.description.clone(),
        })
        .collect();

    match tokio::time::timeout(
        state.classify_timeout,
        state.classifier.find_similar(description, &candidates),
    )
    .await
    {
        Ok(Ok(ids)) => ids.first().copied(),
        Ok(Err(e)) => {
            warn!(backend = state.classifier.name(), "Similarity check failed: {}", e);
            None
        }
        Err(_) => {
            warn!(backend = state.classifier.name(), "Similarity check timed out");
            None
        }
    }
}

/// GET /api/reports and GET /api/reports?unit_id=<uuid>
///
/// Newest first either way.
pub async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ReportsQuery>,
) -> ApiResult<Json<ReportListResponse>> {
    let reports = match query.unit_id.as_deref() {
        Some(raw) => {
            let unit_id = parse_uuid(raw)?;
            db::reports::list_reports_for_unit(&state.db, unit_id).await?
        }
        None => db::reports::list_reports(&state.db).await?,
    };
    Ok(Json(ReportListResponse { reports }))
}

/// POST /api/reports/:id/status
///
/// Moderation: pending reports move to verified or rejected, nothing else.
pub async fn set_report_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Json<Report>> {
    let id = parse_uuid(&id)?;
    let status = body.status.parse::<ReportStatus>()?;
    let report = db::reports::set_status(&state.db, id, status).await?;

    info!(report_id = %report.id, status = %report.status, "Report status updated");
    Ok(Json(report))
}

/// Build report routes
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reports", post(create_report).get(list_reports))
        .route("/api/reports/:id/status", post(set_report_status))
}
