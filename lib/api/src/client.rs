//! HTTP client for the AI recommendation service

use async_trait::async_trait;
use matchmate_core::{Error, Result};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::ai_format::AiUserPayload;
use crate::config::ClientConfig;

/// The external recommender, as seen by the façade
#[async_trait]
pub trait RecommendationService: Send + Sync {
    /// Raw answer of `GET /recommend/{external_id}?n={n}`
    async fn recommend(&self, external_id: &str, n: usize) -> Result<Value>;

    async fn add_model_user(&self, payload: &AiUserPayload) -> Result<Value>;

    async fn train_model(&self) -> Result<Value>;
}

#[derive(Debug, thiserror::Error)]
enum CallError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport: {0}")]
    Transport(String),
    #[error("HTTP {status}: {detail}")]
    Status { status: StatusCode, detail: String },
    #[error("{0}")]
    Malformed(String),
}

impl CallError {
    fn is_retryable(&self) -> bool {
        match self {
            CallError::Timeout(_) => true,
            CallError::Status { status, .. } => status.is_server_error(),
            CallError::Transport(_) | CallError::Malformed(_) => false,
        }
    }
}

impl From<CallError> for Error {
    fn from(e: CallError) -> Self {
        match e {
            CallError::Timeout(after) => Error::ExternalServiceTimeout(after),
            CallError::Malformed(reason) => Error::MalformedPayload(reason),
            other => Error::ExternalService(other.to_string()),
        }
    }
}

/// reqwest-backed [`RecommendationService`]
pub struct HttpRecommendationClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpRecommendationClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::ExternalService(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Base URL with `segments` appended, each one percent-encoded
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| Error::ExternalService(format!("invalid base URL {}: {}", self.config.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::ExternalService(format!("base URL {} cannot take a path", self.config.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute(&self, request: RequestBuilder, timeout: Duration) -> Result<Value> {
        let attempts = self.config.max_retries + 1;
        let mut attempt = 1;
        loop {
            let Some(current) = request.try_clone() else {
                return Err(Error::ExternalService("request body cannot be retried".to_string()));
            };
            match execute_once(current, timeout).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && e.is_retryable() => {
                    warn!(attempt, error = %e, "AI service call failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

async fn execute_once(request: RequestBuilder, timeout: Duration) -> std::result::Result<Value, CallError> {
    let response = request.timeout(timeout).send().await.map_err(|e| classify(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CallError::Status {
            status,
            detail: error_detail(&body, status),
        });
    }

    let body = response.bytes().await.map_err(|e| classify(e, timeout))?;
    serde_json::from_slice(&body).map_err(|e| CallError::Malformed(format!("invalid JSON body: {}", e)))
}

fn classify(e: reqwest::Error, timeout: Duration) -> CallError {
    if e.is_timeout() {
        CallError::Timeout(timeout)
    } else {
        CallError::Transport(e.to_string())
    }
}

/// FastAPI-style `{"detail": ...}` message, or the reason phrase
fn error_detail(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| match v.get("detail") {
            Some(Value::String(detail)) => Some(detail.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string())
}

#[async_trait]
impl RecommendationService for HttpRecommendationClient {
    async fn recommend(&self, external_id: &str, n: usize) -> Result<Value> {
        debug!(external_id, n, "requesting AI recommendations");
        let request = self
            .http
            .get(self.url(&["recommend", external_id])?)
            .query(&[("n", n)]);
        self.execute(request, self.config.timeout).await
    }

    async fn add_model_user(&self, payload: &AiUserPayload) -> Result<Value> {
        debug!(user_id = %payload.user_id, "adding user to AI model");
        let request = self.http.post(self.url(&["add_model_user"])?).json(payload);
        self.execute(request, self.config.timeout).await
    }

    async fn train_model(&self) -> Result<Value> {
        debug!("requesting AI model training");
        let request = self.http.post(self.url(&["train_model"])?).json(&serde_json::json!({}));
        self.execute(request, self.config.train_timeout).await
    }
}
