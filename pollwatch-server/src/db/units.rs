//! Election unit queries and aggregate recompute

use pollwatch_common::models::{ElectionUnit, Severity};
use pollwatch_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Severity score for a unit given the severities of all its reports.
///
/// No reports scores 0. Otherwise the worst severity anchors the score at
/// 25 per rank step (low=25 .. critical=100) and every additional report
/// adds 10, capped at 100. Adding a report never lowers the score, and a
/// worse report never scores below a milder one.
pub fn severity_score(severities: &[Severity]) -> i64 {
    let Some(worst) = severities.iter().max() else {
        return 0;
    };
    let base = 25 * worst.rank() as i64;
    let extra = 10 * (severities.len() as i64 - 1);
    (base + extra).min(100)
}

fn unit_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ElectionUnit> {
    let guid: String = row.get("guid");
    let id = Uuid::parse_str(&guid)
        .map_err(|e| Error::Internal(format!("Failed to parse unit guid: {}", e)))?;

    Ok(ElectionUnit {
        id,
        province: row.get("province"),
        district: row.get("district"),
        sub_district: row.get("sub_district"),
        unit_number: row.get("unit_number"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        voter_count: row.get("voter_count"),
        report_count: row.get("report_count"),
        severity_score: row.get("severity_score"),
    })
}

/// Fetch one unit by id
pub async fn get_unit(pool: &SqlitePool, id: Uuid) -> Result<ElectionUnit> {
    let row = sqlx::query(
        r#"
        SELECT guid, province, district, sub_district, unit_number,
               latitude, longitude, voter_count, report_count, severity_score
        FROM election_units
        WHERE guid = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => unit_from_row(&row),
        None => Err(Error::NotFound(format!("Unit not found: {}", id))),
    }
}

/// List all units in location order (province, district, sub-district,
/// unit number) so repeated reads paint the map the same way
pub async fn list_units(pool: &SqlitePool) -> Result<Vec<ElectionUnit>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, province, district, sub_district, unit_number,
               latitude, longitude, voter_count, report_count, severity_score
        FROM election_units
        ORDER BY province, district, sub_district, unit_number
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(unit_from_row).collect()
}

/// Insert a new unit. Used by the demo seeder and tests; bulk import has
/// its own upsert path.
pub async fn insert_unit(pool: &SqlitePool, unit: &ElectionUnit) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO election_units (
            guid, province, district, sub_district, unit_number,
            latitude, longitude, voter_count, report_count, severity_score
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(unit.id.to_string())
    .bind(&unit.province)
    .bind(&unit.district)
    .bind(&unit.sub_district)
    .bind(unit.unit_number)
    .bind(unit.latitude)
    .bind(unit.longitude)
    .bind(unit.voter_count)
    .bind(unit.report_count)
    .bind(unit.severity_score)
    .execute(pool)
    .await?;

    Ok(())
}

/// Number of units in the catalog
pub async fn count_units(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM election_units")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Recompute a unit's denormalized report_count and severity_score from
/// the reports table.
///
/// Runs inside the caller's transaction, alongside the report write it
/// reflects, so the aggregates can never drift from the reports table.
/// All reports count regardless of status; rejection does not erase an
/// incident from the day's record.
pub async fn recompute_aggregates(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    unit_id: Uuid,
) -> Result<()> {
    let unit_id_str = unit_id.to_string();

    let stored: Vec<String> = sqlx::query_scalar("SELECT severity FROM reports WHERE unit_id = ?")
        .bind(&unit_id_str)
        .fetch_all(&mut **tx)
        .await?;

    // The severity CHECK constraint keeps stored values parseable
    let severities: Vec<Severity> = stored.iter().filter_map(|s| s.parse().ok()).collect();
    let score = severity_score(&severities);

    sqlx::query(
        r#"
        UPDATE election_units
        SET report_count = ?, severity_score = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(severities.len() as i64)
    .bind(score)
    .bind(&unit_id_str)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[test]
    fn test_severity_score_empty() {
        assert_eq!(severity_score(&[]), 0);
    }

    #[test]
    fn test_severity_score_single_report() {
        assert_eq!(severity_score(&[Severity::Low]), 25);
        assert_eq!(severity_score(&[Severity::Medium]), 50);
        assert_eq!(severity_score(&[Severity::High]), 75);
        assert_eq!(severity_score(&[Severity::Critical]), 100);
    }

    #[test]
    fn test_severity_score_counts_additional_reports() {
        assert_eq!(severity_score(&[Severity::Medium, Severity::Medium]), 60);
        assert_eq!(severity_score(&[Severity::High, Severity::Low]), 85);
        assert_eq!(
            severity_score(&[Severity::Low, Severity::Low, Severity::Low]),
            45
        );
    }

    #[test]
    fn test_severity_score_caps_at_100() {
        assert_eq!(severity_score(&[Severity::Critical, Severity::Low]), 100);
        let many_high = vec![Severity::High; 10];
        assert_eq!(severity_score(&many_high), 100);
    }

    #[test]
    fn test_severity_score_never_decreases_when_adding() {
        let mut reports = Vec::new();
        let mut previous = severity_score(&reports);
        for severity in [
            Severity::Low,
            Severity::Critical,
            Severity::Low,
            Severity::Medium,
            Severity::High,
        ] {
            reports.push(severity);
            let next = severity_score(&reports);
            assert!(next >= previous, "score dropped after adding {:?}", severity);
            previous = next;
        }
    }

    #[test]
    fn test_severity_score_order_independent() {
        let a = severity_score(&[Severity::Low, Severity::High, Severity::Medium]);
        let b = severity_score(&[Severity::High, Severity::Medium, Severity::Low]);
        assert_eq!(a, b);
    }

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        pollwatch_common::db::apply_schema(&pool).await.unwrap();
        pool
    }

    fn sample_unit() -> ElectionUnit {
        ElectionUnit {
            id: Uuid::new_v4(),
            province: "กรุงเทพมหานคร".to_string(),
            district: "เขตพญาไท".to_string(),
            sub_district: "สามเสนใน".to_string(),
            unit_number: 1,
            latitude: Some(13.7563),
            longitude: Some(100.5018),
            voter_count: 523,
            report_count: 0,
            severity_score: 0,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_unit() {
        let pool = test_pool().await;
        let unit = sample_unit();
        insert_unit(&pool, &unit).await.unwrap();

        let fetched = get_unit(&pool, unit.id).await.unwrap();
        assert_eq!(fetched.id, unit.id);
        assert_eq!(fetched.province, "กรุงเทพมหานคร");
        assert_eq!(fetched.unit_number, 1);
        assert_eq!(fetched.voter_count, 523);
        assert_eq!(fetched.latitude, Some(13.7563));
    }

    #[tokio::test]
    async fn test_get_unknown_unit_is_not_found() {
        let pool = test_pool().await;
        let result = get_unit(&pool, Uuid::new_v4()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_units_location_order() {
        let pool = test_pool().await;

        let mut second = sample_unit();
        second.unit_number = 2;
        let first = sample_unit();
        insert_unit(&pool, &second).await.unwrap();
        insert_unit(&pool, &first).await.unwrap();

        let units = list_units(&pool).await.unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].unit_number, 1);
        assert_eq!(units[1].unit_number, 2);
    }

    #[tokio::test]
    async fn test_recompute_aggregates_from_reports() {
        let pool = test_pool().await;
        let unit = sample_unit();
        insert_unit(&pool, &unit).await.unwrap();

        for (guid, severity) in [("r1", "high"), ("r2", "low")] {
            sqlx::query(
                "INSERT INTO reports (guid, unit_id, description, severity, reported_at)
                 VALUES (?, ?, 'x', ?, '2026-02-08T09:00:00+00:00')",
            )
            .bind(guid)
            .bind(unit.id.to_string())
            .bind(severity)
            .execute(&pool)
            .await
            .unwrap();
        }

        let mut tx = pool.begin().await.unwrap();
        recompute_aggregates(&mut tx, unit.id).await.unwrap();
        tx.commit().await.unwrap();

        let fetched = get_unit(&pool, unit.id).await.unwrap();
        assert_eq!(fetched.report_count, 2);
        assert_eq!(fetched.severity_score, 85);
    }

    #[tokio::test]
    async fn test_recompute_aggregates_empty_unit_scores_zero() {
        let pool = test_pool().await;
        let mut unit = sample_unit();
        unit.report_count = 3;
        unit.severity_score = 80;
        insert_unit(&pool, &unit).await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        recompute_aggregates(&mut tx, unit.id).await.unwrap();
        tx.commit().await.unwrap();

        let fetched = get_unit(&pool, unit.id).await.unwrap();
        assert_eq!(fetched.report_count, 0);
        assert_eq!(fetched.severity_score, 0);
    }
}
