//! HTTP transport shared by all platform providers.
//!
//! Constructed once at startup and handed to each provider, so tests can
//! swap in a fake and nothing reaches for a global client. Owns the only
//! timeout/retry policy in the system: the aggregator imposes none of its own.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Minimal GET capability the providers need.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url` and return the response body as text.
    async fn get_text(&self, url: &str) -> Result<String, TransportError>;
}

// ── Config ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    /// Extra attempts after the first one.
    pub retry_count: u32,
    pub retry_wait: Duration,
    pub retry_max_wait: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            pool_idle_timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 5,
            retry_count: 2,
            retry_wait: Duration::from_millis(500),
            retry_max_wait: Duration::from_secs(2),
        }
    }
}

impl TransportConfig {
    /// Override the user agent; empty values keep the current one.
    pub fn with_user_agent(mut self, user_agent: Option<&str>) -> Self {
        if let Some(ua) = user_agent.filter(|ua| !ua.is_empty()) {
            self.user_agent = ua.to_string();
        }
        self
    }

    /// Wait before retry number `attempt` (0-based), doubling up to the cap.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.retry_wait
            .checked_mul(factor)
            .map_or(self.retry_max_wait, |wait| wait.min(self.retry_max_wait))
    }
}

// ── reqwest Transport ───────────────────────────────────────────────

pub struct HttpTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(TransportError::Build)?;
        Ok(Self { client, config })
    }

    async fn attempt(&self, url: &str) -> Result<String, TransportError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| TransportError::Request { url: url.to_string(), source })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status { url: url.to_string(), status: status.as_u16() });
        }

        resp.text()
            .await
            .map_err(|source| TransportError::Request { url: url.to_string(), source })
    }
}

/// Connection failures and 5xx responses are worth another attempt.
fn is_retryable(err: &TransportError) -> bool {
    match err {
        TransportError::Request { .. } => true,
        TransportError::Status { status, .. } => *status >= 500,
        TransportError::Build(_) => false,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, url: &str) -> Result<String, TransportError> {
        let mut attempt = 0;
        loop {
            match self.attempt(url).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.config.retry_count && is_retryable(&e) => {
                    let wait = self.config.backoff(attempt);
                    debug!(url, attempt = attempt + 1, wait_ms = wait.as_millis() as u64, error = %e, "Retrying request");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
