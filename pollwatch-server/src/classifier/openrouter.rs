//! OpenRouter classifier backend
//!
//! Chat-completions API with image attachments. Free-tier models: Trinity
//! for classification, GLM (vision) for sign photos, DeepSeek for the
//! similarity comparison.

use pollwatch_common::models::{Classification, LocationGuess};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::parse;
use super::prompt::{self, MAX_PROMPT_IMAGES};
use super::{Classifier, ClassifierError, ReportContext, SimilarCandidate};

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const CLASSIFY_MODEL: &str = "arcee-ai/trinity-large-preview";
const LOCATION_MODEL: &str = "z-ai/glm-4.5-air";
const SIMILAR_MODEL: &str = "tngtech/deepseek-tng-r1t2-chimera";
const RATE_LIMIT_MS: u64 = 500; // 2 requests per second

/// Chat completion response (the fields we read)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
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

/// OpenRouter API client
pub struct OpenRouterClassifier {
    http_client: reqwest::Client,
    api_key: String,
    rate_limiter: Arc<RateLimiter>,
}

impl OpenRouterClassifier {
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

    /// POST a single-message chat completion and return the reply text
    async fn chat(
        &self,
        model: &str,
        content: serde_json::Value,
    ) -> Result<String, ClassifierError> {
        self.rate_limiter.wait().await;

        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": content}],
            "temperature": 0.3,
            "max_tokens": 500,
        });

        tracing::debug!(model = %model, "Querying OpenRouter");

        let response = self
            .http_client
            .post(format!("{}/chat/completions", OPENROUTER_BASE_URL))
            .bearer_auth(&self.api_key)
            .header("X-Title", "pollwatch")
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifierError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::ApiError(status.as_u16(), error_text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::ParseError(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ClassifierError::ParseError("Empty completion".to_string()))
    }
}

#[async_trait::async_trait]
impl Classifier for OpenRouterClassifier {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    async fn classify(
        &self,
        description: &str,
        image_urls: &[String],
        existing: &[ReportContext],
    ) -> Result<Classification, ClassifierError> {
        let mut content = vec![json!({
            "type": "text",
            "text": prompt::classify_prompt(description, existing),
        })];
        for url in image_urls.iter().take(MAX_PROMPT_IMAGES) {
            content.push(json!({
                "type": "image_url",
                "image_url": {"url": url},
            }));
        }

        let reply = self.chat(CLASSIFY_MODEL, json!(content)).await?;

        parse::parse_classification(&reply, description)
            .ok_or_else(|| ClassifierError::ParseError("No JSON object in completion".to_string()))
    }

    async fn extract_location(&self, image_url: &str) -> Result<LocationGuess, ClassifierError> {
        let content = json!([
            {"type": "text", "text": prompt::LOCATION_PROMPT},
            {"type": "image_url", "image_url": {"url": image_url}},
        ]);

        let reply = self.chat(LOCATION_MODEL, content).await?;

        parse::parse_location(&reply)
            .ok_or_else(|| ClassifierError::ParseError("No JSON object in completion".to_string()))
    }

    async fn find_similar(
        &self,
        description: &str,
        candidates: &[SimilarCandidate],
    ) -> Result<Vec<Uuid>, ClassifierError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let content = json!([{
            "type": "text",
            "text": prompt::similar_prompt(description, candidates),
        }]);

        let reply = self.chat(SIMILAR_MODEL, content).await?;

        Ok(parse::parse_similar(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(500);
        assert_eq!(limiter.min_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_client_creation() {
        let client = OpenRouterClassifier::new("test-key".to_string());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_rate_limiter_timing() {
        let limiter = RateLimiter::new(200); // shorter interval for faster test

        let start = Instant::now();

        // First request - no wait
        limiter.wait().await;
        let first_elapsed = start.elapsed();

        // Second request - should wait ~200ms
        limiter.wait().await;
        let second_elapsed = start.elapsed();

        assert!(first_elapsed < Duration::from_millis(100));
        assert!(second_elapsed >= Duration::from_millis(150));
    }
}
