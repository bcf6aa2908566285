//! Batch upsert of unit records
//!
//! One transaction per batch keeps the failure domain small: a bad row
//! costs its own batch, never the whole file. The upsert key is the
//! natural unit identity (province, district, sub_district, unit_number);
//! conflicts refresh coordinates and voter count while leaving the guid
//! and the report aggregates alone.

use crate::records::UnitRecord;
use anyhow::Result;
use sqlx::SqlitePool;
use tracing::{error, info};
use uuid::Uuid;

/// Outcome of one import run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportSummary {
    /// Rows that created a new unit
    pub imported: usize,
    /// Rows that refreshed an existing unit
    pub updated: usize,
    /// Rows in batches that failed and were rolled back
    pub failed: usize,
}

/// Upsert records in fixed-size batches.
///
/// A failing batch is logged and counted; later batches still run. With
/// `dry_run` every batch executes then rolls back, so the summary shows
/// what a real run would do without committing anything.
pub async fn import_records(
    pool: &SqlitePool,
    records: &[UnitRecord],
    batch_size: usize,
    dry_run: bool,
) -> Result<ImportSummary> {
    anyhow::ensure!(batch_size > 0, "batch size must be positive");

    let mut summary = ImportSummary::default();
    let total_batches = records.len().div_ceil(batch_size);

    for (index, batch) in records.chunks(batch_size).enumerate() {
        match upsert_batch(pool, batch, dry_run).await {
            Ok((inserted, updated)) => {
                summary.imported += inserted;
                summary.updated += updated;
                info!(
                    "Batch {}/{}: {} new, {} updated",
                    index + 1,
                    total_batches,
                    inserted,
                    updated
                );
            }
            Err(e) => {
                summary.failed += batch.len();
                error!("Batch {}/{} failed: {}", index + 1, total_batches, e);
            }
        }
    }

    Ok(summary)
}

/// Run one batch inside a transaction. The inserted/updated split comes
/// from the table count delta observed inside the transaction.
async fn upsert_batch(
    pool: &SqlitePool,
    batch: &[UnitRecord],
    dry_run: bool,
) -> Result<(usize, usize)> {
    let mut tx = pool.begin().await?;

    let before: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM election_units")
        .fetch_one(&mut *tx)
        .await?;

    for record in batch {
        sqlx::query(
            r#"
            INSERT INTO election_units
                (guid, province, district, sub_district, unit_number,
                 latitude, longitude, voter_count)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (province, district, sub_district, unit_number)
            DO UPDATE SET
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                voter_count = excluded.voter_count,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&record.province)
        .bind(&record.district)
        .bind(&record.sub_district)
        .bind(record.unit_number)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(record.voter_count)
        .execute(&mut *tx)
        .await?;
    }

    let after: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM election_units")
        .fetch_one(&mut *tx)
        .await?;

    if dry_run {
        tx.rollback().await?;
    } else {
        tx.commit().await?;
    }

    let inserted = (after - before) as usize;
    Ok((inserted, batch.len() - inserted))
}
