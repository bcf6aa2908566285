//! Incident classification
//!
//! Pluggable classifier backends behind the `Classifier` trait:
//! - `KeywordClassifier` - deterministic keyword matching, no network
//! - `OpenRouterClassifier` - OpenRouter chat completions with image support
//! - `GeminiClassifier` - Google Gemini generateContent
//!
//! The backend is selected once at startup. Classification is advisory and
//! fail-soft: any backend failure degrades to a fixed fallback
//! classification, never to a rejected submission.

pub mod gemini;
pub mod mock;
pub mod openrouter;
pub mod parse;
pub mod prompt;

pub use gemini::GeminiClassifier;
pub use mock::KeywordClassifier;
pub use openrouter::OpenRouterClassifier;

use pollwatch_common::models::{Classification, LocationGuess, Severity};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Category assigned when the classifier cannot produce one ("other")
pub const FALLBACK_CATEGORY: &str = "อื่นๆ";

/// Classifier backend errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Classifier not configured: {0}")]
    NotConfigured(String),

    #[error("Not supported by this backend: {0}")]
    NotSupported(String),
}

/// Existing report shown to the classifier for duplicate context
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub id: Uuid,
    pub category: String,
    pub description: String,
}

/// Candidate report for the similarity comparison
#[derive(Debug, Clone)]
pub struct SimilarCandidate {
    pub id: Uuid,
    pub location: String,
    pub description: String,
}

/// Classification backend
///
/// All methods are best-effort: callers treat any error as "no answer" and
/// degrade, they never surface backend errors to the reporter.
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Classify an incident description, optionally with attached image URLs
    /// and existing reports from the same unit for duplicate context
    async fn classify(
        &self,
        description: &str,
        image_urls: &[String],
        existing: &[ReportContext],
    ) -> Result<Classification, ClassifierError>;

    /// Read province/district/unit number off a polling place sign photo
    async fn extract_location(&self, image_url: &str) -> Result<LocationGuess, ClassifierError>;

    /// Pick out candidates describing the same incident. Advisory only.
    async fn find_similar(
        &self,
        description: &str,
        candidates: &[SimilarCandidate],
    ) -> Result<Vec<Uuid>, ClassifierError>;
}

/// The fixed classification used whenever the live backend fails
pub fn fallback_classification(description: &str) -> Classification {
    Classification {
        category: FALLBACK_CATEGORY.to_string(),
        severity: Severity::Medium,
        summary: parse::truncate_chars(description, 100),
        confidence: 0.5,
        possible_duplicate: false,
    }
}

/// Run the classifier with a bounded timeout, degrading to the fixed
/// fallback on error or timeout. The bool is true when the fallback was
/// used.
pub async fn classify_or_fallback(
    classifier: &dyn Classifier,
    description: &str,
    image_urls: &[String],
    existing: &[ReportContext],
    timeout: Duration,
) -> (Classification, bool) {
    match tokio::time::timeout(timeout, classifier.classify(description, image_urls, existing))
        .await
    {
        Ok(Ok(classification)) => (classification, false),
        Ok(Err(e)) => {
            warn!(backend = classifier.name(), "Classification failed: {}", e);
            (fallback_classification(description), true)
        }
        Err(_) => {
            warn!(
                backend = classifier.name(),
                "Classification timed out after {:?}", timeout
            );
            (fallback_classification(description), true)
        }
    }
}

/// Placeholder backend used when a vendor backend is selected but its API
/// key is missing. Every call errors, so every classification degrades to
/// the fallback instead of blocking submissions.
pub struct NullClassifier {
    reason: String,
}

impl NullClassifier {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl Classifier for NullClassifier {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn classify(
        &self,
        _description: &str,
        _image_urls: &[String],
        _existing: &[ReportContext],
    ) -> Result<Classification, ClassifierError> {
        Err(ClassifierError::NotConfigured(self.reason.clone()))
    }

    async fn extract_location(&self, _image_url: &str) -> Result<LocationGuess, ClassifierError> {
        Err(ClassifierError::NotConfigured(self.reason.clone()))
    }

    async fn find_similar(
        &self,
        _description: &str,
        _candidates: &[SimilarCandidate],
    ) -> Result<Vec<Uuid>, ClassifierError> {
        Err(ClassifierError::NotConfigured(self.reason.clone()))
    }
}

/// Build the classifier for the configured backend.
///
/// A vendor backend without its API key, an unknown backend name, or a
/// client construction failure all yield the `NullClassifier` with a
/// warning; startup proceeds either way.
pub fn select_classifier(
    backend: &str,
    openrouter_api_key: Option<&str>,
    gemini_api_key: Option<&str>,
) -> Arc<dyn Classifier> {
    match backend {
        "mock" => Arc::new(KeywordClassifier::new()),
        "openrouter" => match openrouter_api_key {
            Some(key) if !key.is_empty() => match OpenRouterClassifier::new(key.to_string()) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    warn!("Failed to build OpenRouter client: {}", e);
                    Arc::new(NullClassifier::new("OpenRouter client unavailable"))
                }
            },
            _ => {
                warn!("Classifier backend 'openrouter' selected but no API key configured");
                Arc::new(NullClassifier::new("OpenRouter API key not configured"))
            }
        },
        "gemini" => match gemini_api_key {
            Some(key) if !key.is_empty() => match GeminiClassifier::new(key.to_string()) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    warn!("Failed to build Gemini client: {}", e);
                    Arc::new(NullClassifier::new("Gemini client unavailable"))
                }
            },
            _ => {
                warn!("Classifier backend 'gemini' selected but no API key configured");
                Arc::new(NullClassifier::new("Gemini API key not configured"))
            }
        },
        other => {
            warn!("Unknown classifier backend '{}'", other);
            Arc::new(NullClassifier::new(format!(
                "Unknown classifier backend '{}'",
                other
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_classification_shape() {
        let c = fallback_classification("บัตรเลือกตั้งหมด");
        assert_eq!(c.category, FALLBACK_CATEGORY);
        assert_eq!(c.severity, Severity::Medium);
        assert_eq!(c.summary, "บัตรเลือกตั้งหมด");
        assert_eq!(c.confidence, 0.5);
        assert!(!c.possible_duplicate);
    }

    #[test]
    fn test_fallback_summary_truncated_to_100_chars() {
        let description = "ก".repeat(150);
        let c = fallback_classification(&description);
        assert_eq!(c.summary.chars().count(), 100);
    }

    #[tokio::test]
    async fn test_null_classifier_always_errors() {
        let null = NullClassifier::new("no key");
        let result = null.classify("desc", &[], &[]).await;
        assert!(matches!(result, Err(ClassifierError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_classify_or_fallback_degrades_on_error() {
        let null = NullClassifier::new("no key");
        let (classification, fallback) =
            classify_or_fallback(&null, "มีการขัดขวาง", &[], &[], Duration::from_secs(1)).await;
        assert!(fallback);
        assert_eq!(classification.category, FALLBACK_CATEGORY);
        assert_eq!(classification.severity, Severity::Medium);
    }

    #[tokio::test]
    async fn test_classify_or_fallback_uses_live_result() {
        let mock = KeywordClassifier::new();
        let (classification, fallback) =
            classify_or_fallback(&mock, "เครื่องเสีย", &[], &[], Duration::from_secs(1)).await;
        assert!(!fallback);
        assert_eq!(classification.severity, Severity::High);
    }

    #[tokio::test]
    async fn test_classify_or_fallback_times_out() {
        struct SlowClassifier;

        #[async_trait::async_trait]
        impl Classifier for SlowClassifier {
            fn name(&self) -> &'static str {
                "slow"
            }

            async fn classify(
                &self,
                _description: &str,
                _image_urls: &[String],
                _existing: &[ReportContext],
            ) -> Result<Classification, ClassifierError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                unreachable!()
            }

            async fn extract_location(
                &self,
                _image_url: &str,
            ) -> Result<LocationGuess, ClassifierError> {
                Err(ClassifierError::NotSupported("slow".into()))
            }

            async fn find_similar(
                &self,
                _description: &str,
                _candidates: &[SimilarCandidate],
            ) -> Result<Vec<Uuid>, ClassifierError> {
                Ok(Vec::new())
            }
        }

        let (classification, fallback) = classify_or_fallback(
            &SlowClassifier,
            "desc",
            &[],
            &[],
            Duration::from_millis(50),
        )
        .await;
        assert!(fallback);
        assert_eq!(classification.confidence, 0.5);
    }

    #[test]
    fn test_select_classifier_mock() {
        let classifier = select_classifier("mock", None, None);
        assert_eq!(classifier.name(), "keyword-mock");
    }

    #[test]
    fn test_select_classifier_vendor_without_key_is_null() {
        let classifier = select_classifier("openrouter", None, None);
        assert_eq!(classifier.name(), "null");

        let classifier = select_classifier("gemini", Some(""), None);
        assert_eq!(classifier.name(), "null");
    }

    #[test]
    fn test_select_classifier_unknown_backend_is_null() {
        let classifier = select_classifier("watson", None, None);
        assert_eq!(classifier.name(), "null");
    }

    #[test]
    fn test_select_classifier_vendor_with_key() {
        let classifier = select_classifier("openrouter", Some("sk-test"), None);
        assert_eq!(classifier.name(), "openrouter");

        let classifier = select_classifier("gemini", None, Some("g-test"));
        assert_eq!(classifier.name(), "gemini");
    }
}
