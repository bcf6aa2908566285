//! Keyword-matching mock classifier
//!
//! Deterministic, offline backend for demos and tests. Severity and
//! category come from a fixed keyword table over the Thai description;
//! first matching rule wins.

use pollwatch_common::models::{Classification, LocationGuess, Severity};
use uuid::Uuid;

use super::parse::truncate_chars;
use super::{Classifier, ClassifierError, ReportContext, SimilarCandidate, FALLBACK_CATEGORY};

/// Keyword rules, checked in order
const KEYWORD_RULES: &[(&[&str], Severity, &str)] = &[
    (&["ขัดขวาง", "คุกคาม"], Severity::Critical, "การขัดขวางผู้มีสิทธิ"),
    (&["เครื่องเสีย", "ไม่ทำงาน"], Severity::High, "เครื่องลงคะแนนเสีย"),
    (&["ล่าช้า", "รอนาน"], Severity::Medium, "เปิดหน่วยล่าช้า"),
    (&["เล็กน้อย", "น้อย"], Severity::Low, "อื่นๆ"),
];

pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    fn match_rule(description: &str) -> Option<(Severity, &'static str)> {
        KEYWORD_RULES
            .iter()
            .find(|(keywords, _, _)| keywords.iter().any(|k| description.contains(k)))
            .map(|(_, severity, category)| (*severity, *category))
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Classifier for KeywordClassifier {
    fn name(&self) -> &'static str {
        "keyword-mock"
    }

    async fn classify(
        &self,
        description: &str,
        _image_urls: &[String],
        existing: &[ReportContext],
    ) -> Result<Classification, ClassifierError> {
        let (severity, category, confidence) = match Self::match_rule(description) {
            Some((severity, category)) => (severity, category, 0.8),
            None => (Severity::Medium, FALLBACK_CATEGORY, 0.6),
        };

        // A word-for-word repeat of an existing description is flagged as a
        // likely duplicate
        let possible_duplicate = existing.iter().any(|r| r.description == description);

        Ok(Classification {
            category: category.to_string(),
            severity,
            summary: truncate_chars(description, 100),
            confidence,
            possible_duplicate,
        })
    }

    async fn extract_location(&self, _image_url: &str) -> Result<LocationGuess, ClassifierError> {
        // No vision capability: an empty guess, honestly low confidence
        Ok(LocationGuess {
            province: None,
            district: None,
            unit_number: None,
            confidence: 0.0,
        })
    }

    async fn find_similar(
        &self,
        description: &str,
        candidates: &[SimilarCandidate],
    ) -> Result<Vec<Uuid>, ClassifierError> {
        Ok(candidates
            .iter()
            .filter(|c| c.description == description)
            .map(|c| c.id)
            .collect())
    }
}
