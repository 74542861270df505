//! HTTP oracle client
//!
//! Talks to an OpenAI-compatible chat-completions endpoint, asking for
//! a JSON object response and parsing the first choice's content.
//! Requests are rate limited to a configurable minimum interval so a
//! fast-talking interview cannot flood the judgment endpoint.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use super::{Oracle, OracleError};

const DEFAULT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_MIN_INTERVAL_MS: u64 = 200;

/// Rate limiter enforcing a minimum interval between requests
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

    /// Wait if necessary to comply with the rate limit
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

/// Oracle endpoint settings
#[derive(Debug, Clone)]
pub struct OracleSettings {
    /// Base URL of the chat-completions endpoint
    pub base_url: String,
    /// Bearer token, if the endpoint requires one
    pub api_key: Option<String>,
    /// Model identifier passed through to the endpoint
    pub model: String,
    /// Per-request deadline in seconds
    pub timeout_secs: u64,
    /// Minimum interval between requests in milliseconds
    pub min_interval_ms: u64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
        }
    }
}

/// Chat-completions response envelope (the subset we read)
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
    content: String,
}

/// HTTP judgment oracle client
pub struct HttpOracle {
    client: reqwest::Client,
    settings: OracleSettings,
    limiter: RateLimiter,
}

impl HttpOracle {
    /// Create a new HTTP oracle client
    pub fn new(settings: OracleSettings) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| OracleError::Network(e.to_string()))?;

        let limiter = RateLimiter::new(settings.min_interval_ms);
        Ok(Self {
            client,
            settings,
            limiter,
        })
    }

    fn classify(e: reqwest::Error) -> OracleError {
        if e.is_timeout() {
            OracleError::Timeout
        } else {
            OracleError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn invoke(
        &self,
        instructions: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, OracleError> {
        self.limiter.wait().await;

        let body = json!({
            "model": self.settings.model,
            "temperature": 0.0,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": instructions},
                {"role": "user", "content": payload.to_string()},
            ],
        });

        let mut request = self.client.post(&self.settings.base_url).json(&body);
        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(Self::classify)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(OracleError::Api(status.as_u16(), text));
        }

        let chat: ChatResponse = response.json().await.map_err(Self::classify)?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| OracleError::SchemaMismatch("empty choices".to_string()))?;

        serde_json::from_str(content)
            .map_err(|e| OracleError::SchemaMismatch(format!("choice content: {}", e)))
    }
}
