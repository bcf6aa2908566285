//! Report persistence and moderation

use chrono::{DateTime, Utc};
use pollwatch_common::models::{MediaRef, Report, ReportStatus, Severity};
use pollwatch_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::units;

/// A report as submitted, before the store assigns id, timestamp, and status
#[derive(Debug, Clone)]
pub struct NewReport {
    pub unit_id: Uuid,
    pub description: String,
    pub severity: Severity,
    pub media: Vec<MediaRef>,
    pub incident_time: Option<DateTime<Utc>>,
    pub ai_category: Option<String>,
    pub ai_summary: Option<String>,
    pub duplicate_of: Option<Uuid>,
}

fn report_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Report> {
    let guid: String = row.get("guid");
    let id = Uuid::parse_str(&guid)
        .map_err(|e| Error::Internal(format!("Failed to parse report guid: {}", e)))?;

    let unit_id: String = row.get("unit_id");
    let unit_id = Uuid::parse_str(&unit_id)
        .map_err(|e| Error::Internal(format!("Failed to parse unit_id: {}", e)))?;

    let severity: String = row.get("severity");
    let severity = severity
        .parse::<Severity>()
        .map_err(|_| Error::Internal(format!("Invalid stored severity: {}", severity)))?;

    let media: String = row.get("media");
    let media: Vec<MediaRef> = serde_json::from_str(&media)
        .map_err(|e| Error::Internal(format!("Failed to deserialize media: {}", e)))?;

    let reported_at: String = row.get("reported_at");
    let reported_at = chrono::DateTime::parse_from_rfc3339(&reported_at)
        .map_err(|e| Error::Internal(format!("Failed to parse reported_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    let incident_time: Option<String> = row.get("incident_time");
    let incident_time = incident_time
        .map(|s| chrono::DateTime::parse_from_rfc3339(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse incident_time: {}", e)))?
        .map(|dt| dt.with_timezone(&chrono::Utc));

    let duplicate_of: Option<String> = row.get("duplicate_of");
    let duplicate_of = duplicate_of
        .map(|s| Uuid::parse_str(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse duplicate_of: {}", e)))?;

    let status: String = row.get("status");
    let status = status
        .parse::<ReportStatus>()
        .map_err(|_| Error::Internal(format!("Invalid stored status: {}", status)))?;

    Ok(Report {
        id,
        unit_id,
        description: row.get("description"),
        severity,
        media,
        reported_at,
        incident_time,
        ai_category: row.get("ai_category"),
        ai_summary: row.get("ai_summary"),
        duplicate_of,
        status,
    })
}

/// Persist a new report and refresh the owning unit's aggregates.
///
/// Assigns the id, the UTC `reported_at`, and pending status. The insert
/// and the aggregate recompute commit in one transaction, so a failure
/// leaves no half-created report and no stale unit score behind.
pub async fn create_report(pool: &SqlitePool, new: NewReport) -> Result<Report> {
    let report = Report {
        id: Uuid::new_v4(),
        unit_id: new.unit_id,
        description: new.description,
        severity: new.severity,
        media: new.media,
        reported_at: Utc::now(),
        incident_time: new.incident_time,
        ai_category: new.ai_category,
        ai_summary: new.ai_summary,
        duplicate_of: new.duplicate_of,
        status: ReportStatus::Pending,
    };

    // Prepare all bindings before opening the transaction
    let media_json = serde_json::to_string(&report.media)
        .map_err(|e| Error::Internal(format!("Failed to serialize media: {}", e)))?;
    let reported_at = report.reported_at.to_rfc3339();
    let incident_time = report.incident_time.map(|dt| dt.to_rfc3339());
    let duplicate_of = report.duplicate_of.map(|id| id.to_string());

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO reports (
            guid, unit_id, description, severity, media,
            reported_at, incident_time, ai_category, ai_summary,
            duplicate_of, status
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(report.id.to_string())
    .bind(report.unit_id.to_string())
    .bind(&report.description)
    .bind(report.severity.as_str())
    .bind(&media_json)
    .bind(&reported_at)
    .bind(&incident_time)
    .bind(&report.ai_category)
    .bind(&report.ai_summary)
    .bind(&duplicate_of)
    .bind(report.status.as_str())
    .execute(&mut *tx)
    .await?;

    units::recompute_aggregates(&mut tx, report.unit_id).await?;

    tx.commit().await?;

    Ok(report)
}

/// All reports, newest first
pub async fn list_reports(pool: &SqlitePool) -> Result<Vec<Report>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, unit_id, description, severity, media,
               reported_at, incident_time, ai_category, ai_summary,
               duplicate_of, status
        FROM reports
        ORDER BY reported_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(report_from_row).collect()
}

/// One unit's reports, newest first
pub async fn list_reports_for_unit(pool: &SqlitePool, unit_id: Uuid) -> Result<Vec<Report>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, unit_id, description, severity, media,
               reported_at, incident_time, ai_category, ai_summary,
               duplicate_of, status
        FROM reports
        WHERE unit_id = ?
        ORDER BY reported_at DESC
        "#,
    )
    .bind(unit_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(report_from_row).collect()
}

/// Fetch one report by id
pub async fn get_report(pool: &SqlitePool, id: Uuid) -> Result<Report> {
    let row = sqlx::query(
        r#"
        SELECT guid, unit_id, description, severity, media,
               reported_at, incident_time, ai_category, ai_summary,
               duplicate_of, status
        FROM reports
        WHERE guid = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => report_from_row(&row),
        None => Err(Error::NotFound(format!("Report not found: {}", id))),
    }
}

/// Whether a report with this id exists
pub async fn report_exists(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM reports WHERE guid = ?)")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Apply a moderation decision.
///
/// Only pending reports can move, and only to verified or rejected; any
/// other transition is InvalidInput. Unknown ids are NotFound.
pub async fn set_status(pool: &SqlitePool, id: Uuid, status: ReportStatus) -> Result<Report> {
    let mut report = get_report(pool, id).await?;

    if report.status != ReportStatus::Pending || status == ReportStatus::Pending {
        return Err(Error::InvalidInput(format!(
            "Invalid status transition: {} -> {}",
            report.status, status
        )));
    }

    sqlx::query("UPDATE reports SET status = ? WHERE guid = ?")
        .bind(status.as_str())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    report.status = status;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollwatch_common::models::{ElectionUnit, MediaType};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        pollwatch_common::db::apply_schema(&pool).await.unwrap();
        pool
    }

    async fn insert_test_unit(pool: &SqlitePool) -> Uuid {
        let unit = ElectionUnit {
            id: Uuid::new_v4(),
            province: "เชียงใหม่".to_string(),
            district: "เมืองเชียงใหม่".to_string(),
            sub_district: "ศรีภูมิ".to_string(),
            unit_number: 1,
            latitude: Some(18.7883),
            longitude: Some(98.9853),
            voter_count: 445,
            report_count: 0,
            severity_score: 0,
        };
        units::insert_unit(pool, &unit).await.unwrap();
        unit.id
    }

    fn draft(unit_id: Uuid) -> NewReport {
        NewReport {
            unit_id,
            description: "เครื่องลงคะแนนเสีย ไม่สามารถใช้งานได้".to_string(),
            severity: Severity::High,
            media: vec![MediaRef {
                url: "/media/a.jpg".to_string(),
                media_type: MediaType::Image,
            }],
            incident_time: None,
            ai_category: Some("เครื่องลงคะแนนเสีย".to_string()),
            ai_summary: Some("เครื่องลงคะแนนมีปัญหา".to_string()),
            duplicate_of: None,
        }
    }

    #[tokio::test]
    async fn test_create_report_roundtrip() {
        let pool = test_pool().await;
        let unit_id = insert_test_unit(&pool).await;

        let created = create_report(&pool, draft(unit_id)).await.unwrap();
        assert_eq!(created.status, ReportStatus::Pending);

        let fetched = get_report(&pool, created.id).await.unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.unit_id, unit_id);
        assert_eq!(fetched.severity, Severity::High);
        assert_eq!(fetched.media.len(), 1);
        assert_eq!(fetched.media[0].url, "/media/a.jpg");
        assert_eq!(fetched.ai_category.as_deref(), Some("เครื่องลงคะแนนเสีย"));
        assert_eq!(fetched.reported_at, created.reported_at);
        assert!(fetched.incident_time.is_none());
    }

    #[tokio::test]
    async fn test_create_report_refreshes_unit_aggregates() {
        let pool = test_pool().await;
        let unit_id = insert_test_unit(&pool).await;

        create_report(&pool, draft(unit_id)).await.unwrap();
        let unit = units::get_unit(&pool, unit_id).await.unwrap();
        assert_eq!(unit.report_count, 1);
        assert_eq!(unit.severity_score, 75);

        let mut second = draft(unit_id);
        second.severity = Severity::Low;
        create_report(&pool, second).await.unwrap();
        let unit = units::get_unit(&pool, unit_id).await.unwrap();
        assert_eq!(unit.report_count, 2);
        assert_eq!(unit.severity_score, 85);
    }

    #[tokio::test]
    async fn test_create_report_unknown_unit_leaves_nothing_behind() {
        let pool = test_pool().await;

        // Foreign key violation rolls the transaction back
        let result = create_report(&pool, draft(Uuid::new_v4())).await;
        assert!(result.is_err());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_list_reports_newest_first() {
        let pool = test_pool().await;
        let unit_id = insert_test_unit(&pool).await;

        for (guid, reported_at) in [
            ("00000000-0000-0000-0000-000000000001", "2026-02-08T08:00:00+00:00"),
            ("00000000-0000-0000-0000-000000000002", "2026-02-08T11:30:00+00:00"),
            ("00000000-0000-0000-0000-000000000003", "2026-02-08T09:45:00+00:00"),
        ] {
            sqlx::query(
                "INSERT INTO reports (guid, unit_id, description, severity, reported_at)
                 VALUES (?, ?, 'x', 'medium', ?)",
            )
            .bind(guid)
            .bind(unit_id.to_string())
            .bind(reported_at)
            .execute(&pool)
            .await
            .unwrap();
        }

        let reports = list_reports(&pool).await.unwrap();
        assert_eq!(reports.len(), 3);
        assert!(reports[0].reported_at > reports[1].reported_at);
        assert!(reports[1].reported_at > reports[2].reported_at);

        let for_unit = list_reports_for_unit(&pool, unit_id).await.unwrap();
        assert_eq!(for_unit.len(), 3);
        assert!(for_unit[0].reported_at > for_unit[2].reported_at);
    }

    #[tokio::test]
    async fn test_list_reports_for_unit_filters() {
        let pool = test_pool().await;
        let unit_id = insert_test_unit(&pool).await;

        create_report(&pool, draft(unit_id)).await.unwrap();
        let other = list_reports_for_unit(&pool, Uuid::new_v4()).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_report_is_not_found() {
        let pool = test_pool().await;
        let result = get_report(&pool, Uuid::new_v4()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_status_pending_to_verified() {
        let pool = test_pool().await;
        let unit_id = insert_test_unit(&pool).await;
        let created = create_report(&pool, draft(unit_id)).await.unwrap();

        let updated = set_status(&pool, created.id, ReportStatus::Verified)
            .await
            .unwrap();
        assert_eq!(updated.status, ReportStatus::Verified);

        let fetched = get_report(&pool, created.id).await.unwrap();
        assert_eq!(fetched.status, ReportStatus::Verified);
    }

    #[tokio::test]
    async fn test_set_status_rejects_reverse_transitions() {
        let pool = test_pool().await;
        let unit_id = insert_test_unit(&pool).await;
        let created = create_report(&pool, draft(unit_id)).await.unwrap();

        set_status(&pool, created.id, ReportStatus::Rejected)
            .await
            .unwrap();

        // Rejected is terminal
        let result = set_status(&pool, created.id, ReportStatus::Verified).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let result = set_status(&pool, created.id, ReportStatus::Pending).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_set_status_to_pending_is_invalid_even_when_pending() {
        let pool = test_pool().await;
        let unit_id = insert_test_unit(&pool).await;
        let created = create_report(&pool, draft(unit_id)).await.unwrap();

        let result = set_status(&pool, created.id, ReportStatus::Pending).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_set_status_unknown_report_is_not_found() {
        let pool = test_pool().await;
        let result = set_status(&pool, Uuid::new_v4(), ReportStatus::Verified).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
