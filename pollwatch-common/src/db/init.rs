//! Database initialization
//!
//! Opens (or creates) the SQLite database, applies the schema, and seeds
//! default settings. All steps are idempotent so every binary can call
//! `init_database` unconditionally at startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Initialize database connection and create tables if needed
///
/// Connection options apply per-connection, so foreign key enforcement and
/// the busy timeout hold on every pooled connection. WAL allows concurrent
/// readers while one writer holds the lock; election day traffic is
/// read-heavy with bursts of report writes.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let path_str = db_path
        .to_str()
        .ok_or_else(|| crate::Error::Config(format!("Invalid database path: {:?}", db_path)))?;

    let options = SqliteConnectOptions::from_str(path_str)
        .map_err(crate::Error::Database)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    apply_schema(&pool).await?;

    Ok(pool)
}

/// Create tables and seed default settings on an open pool.
///
/// Split out from `init_database` so tests can run the full schema against
/// an in-memory pool.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Table creation is idempotent - safe to call multiple times
    create_election_units_table(pool).await?;
    create_reports_table(pool).await?;
    create_votes_table(pool).await?;
    create_settings_table(pool).await?;

    init_default_settings(pool).await?;

    Ok(())
}

/// Create the election_units table
///
/// Polling places with denormalized report aggregates. The natural key
/// (province, district, sub_district, unit_number) backs the bulk-import
/// upsert.
pub async fn create_election_units_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS election_units (
            guid TEXT PRIMARY KEY,
            province TEXT NOT NULL,
            district TEXT NOT NULL,
            sub_district TEXT NOT NULL,
            unit_number INTEGER NOT NULL CHECK (unit_number > 0),
            latitude REAL,
            longitude REAL,
            voter_count INTEGER NOT NULL DEFAULT 0 CHECK (voter_count >= 0),
            report_count INTEGER NOT NULL DEFAULT 0 CHECK (report_count >= 0),
            severity_score INTEGER NOT NULL DEFAULT 0 CHECK (severity_score >= 0 AND severity_score <= 100),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (province, district, sub_district, unit_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_units_province ON election_units(province)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the reports table
///
/// `media` holds a JSON array of {url, media_type} objects. Timestamps are
/// RFC3339 TEXT so lexicographic ORDER BY matches chronological order.
/// `duplicate_of` is a weak reference on purpose: the target report may be
/// rejected later and the link simply goes stale.
pub async fn create_reports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            guid TEXT PRIMARY KEY,
            unit_id TEXT NOT NULL REFERENCES election_units(guid),
            description TEXT NOT NULL CHECK (length(description) > 0),
            severity TEXT NOT NULL CHECK (severity IN ('low', 'medium', 'high', 'critical')),
            media TEXT NOT NULL DEFAULT '[]',
            reported_at TEXT NOT NULL,
            incident_time TEXT,
            ai_category TEXT,
            ai_summary TEXT,
            duplicate_of TEXT,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'verified', 'rejected'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reports_unit_time ON reports(unit_id, reported_at DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reports_time ON reports(reported_at DESC)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the votes table
///
/// One rating per (report_id, voter_id); the primary key backs the
/// last-write-wins upsert.
pub async fn create_votes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS votes (
            report_id TEXT NOT NULL REFERENCES reports(guid) ON DELETE CASCADE,
            voter_id TEXT NOT NULL,
            rating INTEGER NOT NULL CHECK (rating >= 1 AND rating <= 5),
            rated_at TEXT NOT NULL,
            PRIMARY KEY (report_id, voter_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values. NULL values
/// are reset to defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Classifier settings
    ensure_setting(pool, "classifier_backend", "mock").await?;
    ensure_setting(pool, "classify_timeout_ms", "15000").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE handles concurrent initialization races: multiple
        // tasks may pass the exists check simultaneously
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!(
            "Initialized setting '{}' with default value: {}",
            key, default_value
        );
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}
