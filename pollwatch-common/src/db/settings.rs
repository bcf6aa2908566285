//! Settings table access
//!
//! Key-value configuration persisted in the database. String get/set plus
//! typed helpers for the keys PollWatch reads at startup.

use crate::Result;
use sqlx::SqlitePool;
use tracing::warn;

/// Read a setting value, or None if the key is absent or NULL
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten())
}

/// Write a setting value, inserting or overwriting
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Read an integer setting. A malformed value is treated as absent with a
/// warning so a bad row cannot stop startup.
pub async fn get_setting_u64(pool: &SqlitePool, key: &str) -> Result<Option<u64>> {
    match get_setting(pool, key).await? {
        Some(v) => match v.parse() {
            Ok(n) => Ok(Some(n)),
            Err(_) => {
                warn!("Setting '{}' has non-integer value '{}', ignoring", key, v);
                Ok(None)
            }
        },
        None => Ok(None),
    }
}
