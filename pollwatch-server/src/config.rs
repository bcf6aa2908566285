//! Configuration resolution for pollwatch-server
//!
//! Multi-tier resolution with Database -> ENV -> TOML priority. The
//! database settings table is authoritative; the TOML file is the
//! at-rest fallback.

use pollwatch_common::config::TomlConfig;
use pollwatch_common::db::{get_setting, get_setting_u64};
use pollwatch_common::Result;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{info, warn};

/// Default classify timeout when the setting is missing or malformed
const DEFAULT_CLASSIFY_TIMEOUT_MS: u64 = 15_000;

/// Resolve the classifier backend name (`mock`, `openrouter`, `gemini`).
///
/// Unknown names are passed through; classifier selection downgrades them
/// to the null backend with a warning rather than refusing to start.
pub async fn resolve_classifier_backend(
    db: &SqlitePool,
    toml_config: &TomlConfig,
) -> Result<String> {
    let mut sources = Vec::new();

    let db_value = get_setting(db, "classifier_backend").await?;
    if db_value.as_deref().is_some_and(is_valid_value) {
        sources.push("database");
    }

    let env_value = std::env::var("POLLWATCH_CLASSIFIER_BACKEND").ok();
    if env_value.as_deref().is_some_and(is_valid_value) {
        sources.push("environment");
    }

    let toml_value = toml_config.classifier_backend.as_ref();
    if toml_value.map(|s| s.as_str()).is_some_and(is_valid_value) {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "Classifier backend set in multiple sources: {}. Using database (highest priority).",
            sources.join(", ")
        );
    }

    for (value, source) in [
        (db_value, "database"),
        (env_value, "environment"),
        (toml_value.cloned(), "TOML config"),
    ] {
        if let Some(value) = value {
            if is_valid_value(&value) {
                info!("Classifier backend '{}' loaded from {}", value.trim(), source);
                return Ok(value.trim().to_string());
            }
        }
    }

    info!("Classifier backend not configured, defaulting to mock");
    Ok("mock".to_string())
}

/// Resolve the OpenRouter API key, if configured anywhere
pub async fn resolve_openrouter_api_key(
    db: &SqlitePool,
    toml_config: &TomlConfig,
) -> Result<Option<String>> {
    resolve_api_key(
        db,
        "OpenRouter",
        "openrouter_api_key",
        "POLLWATCH_OPENROUTER_API_KEY",
        toml_config.openrouter_api_key.as_ref(),
    )
    .await
}

/// Resolve the Gemini API key, if configured anywhere
pub async fn resolve_gemini_api_key(
    db: &SqlitePool,
    toml_config: &TomlConfig,
) -> Result<Option<String>> {
    resolve_api_key(
        db,
        "Gemini",
        "gemini_api_key",
        "POLLWATCH_GEMINI_API_KEY",
        toml_config.gemini_api_key.as_ref(),
    )
    .await
}

/// Resolve the classify timeout from settings, falling back to 15 s
pub async fn resolve_classify_timeout(db: &SqlitePool) -> Result<Duration> {
    let ms = get_setting_u64(db, "classify_timeout_ms")
        .await?
        .unwrap_or(DEFAULT_CLASSIFY_TIMEOUT_MS);
    Ok(Duration::from_millis(ms))
}

/// Shared Database -> ENV -> TOML resolution for vendor API keys.
///
/// A missing key is not an error; the server falls back to the null
/// classifier and every submission degrades to the fixed fallback.
async fn resolve_api_key(
    db: &SqlitePool,
    label: &str,
    setting_key: &str,
    env_var: &str,
    toml_value: Option<&String>,
) -> Result<Option<String>> {
    let mut sources = Vec::new();

    let db_key = get_setting(db, setting_key).await?;
    if db_key.as_deref().is_some_and(is_valid_value) {
        sources.push("database");
    }

    let env_key = std::env::var(env_var).ok();
    if env_key.as_deref().is_some_and(is_valid_value) {
        sources.push("environment");
    }

    if toml_value.map(|s| s.as_str()).is_some_and(is_valid_value) {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "{} API key found in multiple sources: {}. Using database (highest priority).",
            label,
            sources.join(", ")
        );
    }

    for (key, source) in [
        (db_key, "database"),
        (env_key, "environment"),
        (toml_value.cloned(), "TOML config"),
    ] {
        if let Some(key) = key {
            if is_valid_value(&key) {
                info!("{} API key loaded from {}", label, source);
                return Ok(Some(key.trim().to_string()));
            }
        }
    }

    Ok(None)
}

/// A configured value counts only if it is non-empty after trimming
fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}
