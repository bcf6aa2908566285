//! Classifier reply parsing
//!
//! LLM replies are prose-tolerant: the first balanced brace-delimited JSON
//! object anywhere in the text is extracted and deserialized. Field-level
//! defaults mirror the fail-soft contract, so a partially usable reply
//! still yields a complete classification.

use pollwatch_common::models::{Classification, LocationGuess, Severity};
use serde::Deserialize;
use uuid::Uuid;

use super::FALLBACK_CATEGORY;

/// Extract the first balanced JSON object from free-form text.
///
/// Scans from the first `{`, tracking string and escape state so braces
/// inside string values do not unbalance the count. Returns None when no
/// complete object is present.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    // Byte scan is safe: every byte compared is ASCII, and the returned
    // slice starts and ends on ASCII braces
    for (i, &b) in text.as_bytes().iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Truncate to at most `max` characters on a char boundary.
///
/// Thai text is multi-byte in UTF-8; byte slicing would panic mid-character.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Lenient severity parse for classifier output: unknown or missing values
/// become Medium rather than an error.
pub fn parse_severity(s: &str) -> Severity {
    match s.trim().to_lowercase().as_str() {
        "low" => Severity::Low,
        "medium" => Severity::Medium,
        "high" => Severity::High,
        "critical" => Severity::Critical,
        _ => Severity::Medium,
    }
}

/// Raw classification reply, camelCase keys as prompted
#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default, alias = "possibleDuplicate")]
    possible_duplicate: Option<bool>,
}

/// Parse a classifier reply into a complete classification, or None when no
/// usable JSON object is present.
pub fn parse_classification(reply: &str, description: &str) -> Option<Classification> {
    let json = extract_json_object(reply)?;
    let raw: RawClassification = serde_json::from_str(json).ok()?;

    let category = match raw.category {
        Some(c) if !c.trim().is_empty() => c,
        _ => FALLBACK_CATEGORY.to_string(),
    };
    let summary = match raw.summary {
        Some(s) if !s.trim().is_empty() => truncate_chars(&s, 100),
        _ => truncate_chars(description, 100),
    };

    Some(Classification {
        category,
        severity: raw.severity.as_deref().map(parse_severity).unwrap_or(Severity::Medium),
        summary,
        confidence: raw.confidence.unwrap_or(0.7).clamp(0.0, 1.0),
        possible_duplicate: raw.possible_duplicate.unwrap_or(false),
    })
}

/// Raw location reply, camelCase keys as prompted
#[derive(Debug, Deserialize)]
struct RawLocation {
    #[serde(default)]
    province: Option<String>,
    #[serde(default)]
    district: Option<String>,
    #[serde(default, alias = "unitNumber")]
    unit_number: Option<serde_json::Value>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Parse a location-extraction reply. None when no usable JSON object is
/// present; the caller degrades to a zero-confidence guess.
pub fn parse_location(reply: &str) -> Option<LocationGuess> {
    let json = extract_json_object(reply)?;
    let raw: RawLocation = serde_json::from_str(json).ok()?;

    // Models return the unit number as either a number or a string
    let unit_number = raw.unit_number.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    });

    Some(LocationGuess {
        province: raw.province.filter(|s| !s.trim().is_empty()),
        district: raw.district.filter(|s| !s.trim().is_empty()),
        unit_number,
        confidence: raw.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
    })
}

/// Raw similarity reply
#[derive(Debug, Deserialize)]
struct RawSimilar {
    #[serde(default, alias = "similarIds")]
    similar_ids: Option<Vec<String>>,
}

/// Parse a similarity reply into report ids, skipping malformed entries.
/// Empty on any failure.
pub fn parse_similar(reply: &str) -> Vec<Uuid> {
    let Some(json) = extract_json_object(reply) else {
        return Vec::new();
    };
    let Ok(raw) = serde_json::from_str::<RawSimilar>(json) else {
        return Vec::new();
    };

    raw.similar_ids
        .unwrap_or_default()
        .iter()
        .filter_map(|id| Uuid::parse_str(id).ok())
        .collect()
}
