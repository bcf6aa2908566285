//! Google Gemini classifier backend
//!
//! Text-only generateContent calls against the Generative Language REST
//! API. Sign-photo location extraction is not offered by this backend.

use pollwatch_common::models::{Classification, LocationGuess};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::parse;
use super::prompt;
use super::{Classifier, ClassifierError, ReportContext, SimilarCandidate};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_MODEL: &str = "gemini-1.5-flash-latest";
const RATE_LIMIT_MS: u64 = 500; // 2 requests per second

/// generateContent response (the fields we read)
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Rate limiter enforcing the per-client request interval
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Gemini API client
pub struct GeminiClassifier {
    http_client: reqwest::Client,
    api_key: String,
    rate_limiter: Arc<RateLimiter>,
}

impl GeminiClassifier {
    pub fn new(api_key: String) -> Result<Self, ClassifierError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClassifierError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
        })
    }

    /// POST a text prompt and return the concatenated reply text
    async fn generate(&self, prompt_text: &str) -> Result<String, ClassifierError> {
        self.rate_limiter.wait().await;

        let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, GEMINI_MODEL);
        let body = json!({
            "contents": [{"parts": [{"text": prompt_text}]}],
            "generationConfig": {
                "temperature": 0.3,
                "maxOutputTokens": 500,
            },
        });

        tracing::debug!(model = GEMINI_MODEL, "Querying Gemini");

        // API key goes in the query string, never in logs
        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifierError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::ApiError(status.as_u16(), error_text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::ParseError(e.to_string()))?;

        let reply: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if reply.is_empty() {
            return Err(ClassifierError::ParseError("Empty completion".to_string()));
        }

        Ok(reply)
    }
}

#[async_trait::async_trait]
impl Classifier for GeminiClassifier {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn classify(
        &self,
        description: &str,
        _image_urls: &[String],
        existing: &[ReportContext],
    ) -> Result<Classification, ClassifierError> {
        let reply = self
            .generate(&prompt::classify_prompt(description, existing))
            .await?;

        parse::parse_classification(&reply, description)
            .ok_or_else(|| ClassifierError::ParseError("No JSON object in completion".to_string()))
    }

    async fn extract_location(&self, _image_url: &str) -> Result<LocationGuess, ClassifierError> {
        Err(ClassifierError::NotSupported(
            "Gemini backend does not read sign photos".to_string(),
        ))
    }

    async fn find_similar(
        &self,
        description: &str,
        candidates: &[SimilarCandidate],
    ) -> Result<Vec<Uuid>, ClassifierError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let reply = self
            .generate(&prompt::similar_prompt(description, candidates))
            .await?;

        Ok(parse::parse_similar(&reply))
    }
}
