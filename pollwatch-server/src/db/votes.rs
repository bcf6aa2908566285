//! Community vote storage
//!
//! One rating per (report, voter); re-rating overwrites. The voter id is a
//! weak client-generated token, good enough to stop casual double-voting
//! but not an identity.

use chrono::Utc;
use pollwatch_common::models::{Vote, VoteAggregate};
use pollwatch_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::reports;

/// Insert or replace one voter's rating of a report
pub async fn upsert_vote(
    pool: &SqlitePool,
    report_id: Uuid,
    voter_id: &str,
    rating: i64,
) -> Result<Vote> {
    if !(1..=5).contains(&rating) {
        return Err(Error::InvalidInput(format!(
            "Rating must be between 1 and 5, got {}",
            rating
        )));
    }
    if voter_id.is_empty() {
        return Err(Error::InvalidInput("voter_id must not be empty".to_string()));
    }
    if !reports::report_exists(pool, report_id).await? {
        return Err(Error::NotFound(format!("Report not found: {}", report_id)));
    }

    let vote = Vote {
        report_id,
        voter_id: voter_id.to_string(),
        rating,
        rated_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO votes (report_id, voter_id, rating, rated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(report_id, voter_id) DO UPDATE SET
            rating = excluded.rating,
            rated_at = excluded.rated_at
        "#,
    )
    .bind(report_id.to_string())
    .bind(voter_id)
    .bind(rating)
    .bind(vote.rated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(vote)
}

/// Average rating and vote count for a report.
///
/// With zero votes the count is 0 and the average is None; unknown report
/// ids are NotFound rather than an empty aggregate.
pub async fn get_aggregate(pool: &SqlitePool, report_id: Uuid) -> Result<VoteAggregate> {
    if !reports::report_exists(pool, report_id).await? {
        return Err(Error::NotFound(format!("Report not found: {}", report_id)));
    }

    let row = sqlx::query(
        "SELECT AVG(rating) AS average, COUNT(*) AS count FROM votes WHERE report_id = ?",
    )
    .bind(report_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(VoteAggregate {
        average: row.get("average"),
        count: row.get("count"),
    })
}
