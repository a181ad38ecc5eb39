//! HTTP client for the update-job API
//!
//! - Configurable timeout and User-Agent
//! - Bounded retries (max 3) with jittered exponential backoff
//! - Only connection errors, timeouts and 500/502/503/504 are retried
//! - Sleeping goes through [`Sleeper`] so retry policy is testable without delays

use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for HTTP requests (30 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header
const DEFAULT_USER_AGENT: &str = concat!("depwright/", env!("CARGO_PKG_VERSION"));

/// Maximum number of retry attempts
pub const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
const BASE_DELAY_MS: u64 = 100;

/// Waits between retry attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// HTTP client wrapper with retry logic
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    token: Option<String>,
    max_retries: u32,
    sleeper: Arc<dyn Sleeper>,
}

impl ApiClient {
    /// Create a new API client with default settings
    pub fn new() -> Result<Self, ApiError> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Create a new API client with custom configuration
    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ApiError::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            token: None,
            max_retries: MAX_RETRIES,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Set the job token sent as the `Authorization` header
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Replace the sleeper used between retries
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// POST a JSON body, retrying transient failures
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<(), ApiError> {
        self.with_retries(url, || self.post_once(url, body)).await
    }

    async fn post_once(&self, url: &str, body: &Value) -> Result<(), ApiError> {
        let mut request = self.client.post(url).json(body);
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout {
                    url: url.to_string(),
                }
            } else {
                ApiError::Connection {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    /// Runs `attempt` until it succeeds, fails permanently or the retry budget is spent
    pub async fn with_retries<T, F, Fut>(&self, url: &str, mut attempt: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut retries = 0;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && retries < self.max_retries => {
                    let delay = backoff_delay(retries);
                    warn!(url, attempt = retries + 1, "Retrying after error: {}", error);
                    self.sleeper.sleep(delay).await;
                    retries += 1;
                }
                Err(error) => {
                    debug!(url, retries, "Giving up: {}", error);
                    return Err(error);
                }
            }
        }
    }
}

/// Exponential backoff with up to 50% jitter
fn backoff_delay(retry: u32) -> Duration {
    let base = BASE_DELAY_MS * 2u64.pow(retry);
    let jitter = u64::from(chrono::Utc::now().timestamp_subsec_nanos()) % (base / 2 + 1);
    Duration::from_millis(base + jitter)
}
