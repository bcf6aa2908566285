//! Core entity models shared across PollWatch services

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// Incident severity level
///
/// Variant order is significant: derived `Ord` sorts Low < Medium < High <
/// Critical, which `rank()` and the unit severity score rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severity levels, worst last
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Numeric rank used by the unit severity score (low=1 .. critical=4)
    pub fn rank(&self) -> u32 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }

    /// Canonical lowercase name, matching the database CHECK constraint
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    /// Strict parse for user-supplied values; classifier replies go through
    /// the lenient parser in the server instead.
    fn from_str(s: &str) -> std::result::Result<Self, Error> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(Error::InvalidInput(format!(
                "Unknown severity: {} (expected low, medium, high, or critical)",
                other
            ))),
        }
    }
}

/// Report moderation status
///
/// Lifecycle: pending → verified or pending → rejected. Reverse transitions
/// are rejected with InvalidInput.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Verified,
    Rejected,
}

impl ReportStatus {
    /// Canonical lowercase name, matching the database CHECK constraint
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Verified => "verified",
            ReportStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Error> {
        match s {
            "pending" => Ok(ReportStatus::Pending),
            "verified" => Ok(ReportStatus::Verified),
            "rejected" => Ok(ReportStatus::Rejected),
            other => Err(Error::InvalidInput(format!(
                "Unknown report status: {} (expected pending, verified, or rejected)",
                other
            ))),
        }
    }
}

/// Media attachment kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// Classify an upload by its declared content type: `video/*` is video,
    /// everything else is image.
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.starts_with("video/") {
            MediaType::Video
        } else {
            MediaType::Image
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to a stored media attachment
///
/// Serialized as a JSON array element in the `reports.media` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Public URL path of the stored file (e.g. `/media/<name>`)
    pub url: String,

    /// Image or video, derived from the upload content type
    pub media_type: MediaType,
}

/// Polling place with denormalized incident aggregates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionUnit {
    pub id: Uuid,

    pub province: String,

    pub district: String,

    pub sub_district: String,

    /// Unit number, unique within province + district + sub-district
    pub unit_number: i64,

    /// WGS84 decimal degrees
    pub latitude: Option<f64>,

    /// WGS84 decimal degrees
    pub longitude: Option<f64>,

    /// Registered voters at this unit
    pub voter_count: i64,

    /// Denormalized count of reports filed against this unit
    pub report_count: i64,

    /// Denormalized severity score, 0-100
    pub severity_score: i64,
}

/// Citizen incident report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,

    /// Unit the incident was observed at
    pub unit_id: Uuid,

    pub description: String,

    /// Final stored severity (reporter-selected; classifier output is advisory)
    pub severity: Severity,

    /// Ordered media attachments
    pub media: Vec<MediaRef>,

    /// Server-assigned submission timestamp (UTC)
    pub reported_at: DateTime<Utc>,

    /// When the incident happened, if known (reporter-supplied or EXIF-derived)
    pub incident_time: Option<DateTime<Utc>>,

    /// Category assigned by the classifier, if any
    pub ai_category: Option<String>,

    /// Classifier summary, at most 100 characters
    pub ai_summary: Option<String>,

    /// Weak reference to a suspected duplicate report. No FK; the target may
    /// have been rejected or may not resolve at read time.
    pub duplicate_of: Option<Uuid>,

    pub status: ReportStatus,
}

/// One voter's rating of a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub report_id: Uuid,

    /// Weak client-generated voter token
    pub voter_id: String,

    /// 1-5
    pub rating: i64,

    pub rated_at: DateTime<Utc>,
}

/// Aggregate rating for a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteAggregate {
    /// Mean rating, or null when no votes exist
    pub average: Option<f64>,

    pub count: i64,
}

/// Classifier output for a report description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Free-text incident category
    pub category: String,

    pub severity: Severity,

    /// At most 100 characters
    pub summary: String,

    /// 0.0 - 1.0
    pub confidence: f64,

    /// Advisory duplicate flag; never auto-merges reports
    pub possible_duplicate: bool,
}

/// Best-effort location extracted from a photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationGuess {
    pub province: Option<String>,

    pub district: Option<String>,

    pub unit_number: Option<i64>,

    /// 0.0 - 1.0; 0 when extraction failed
    pub confidence: f64,
}
