//! Bounded retry with exponential backoff for transient fetch failures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::app::{FedimageError, Result};
use crate::config::RetryConfig;
use crate::fetcher::Fetcher;

/// Classifies errors as transient (worth another attempt) or permanent.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FedimageError {
    fn is_retryable(&self) -> bool {
        match self {
            FedimageError::Http(e) => e.is_timeout() || e.is_connect(),
            // 429 Too Many Requests and server-side failures
            FedimageError::FetchStatus { status, .. } => *status == 429 || *status >= 500,
            FedimageError::Database(_)
            | FedimageError::Migration(_)
            | FedimageError::MissingAttribution { .. }
            | FedimageError::InvalidFeedUrl(_)
            | FedimageError::InvalidMediaUrl(_)
            | FedimageError::Filesystem { .. }
            | FedimageError::Config(_) => false,
        }
    }
}

/// Wraps another [`Fetcher`], retrying transient failures.
pub struct RetryingFetcher {
    inner: Arc<dyn Fetcher + Send + Sync>,
    config: RetryConfig,
}

impl RetryingFetcher {
    pub fn new(inner: Arc<dyn Fetcher + Send + Sync>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    fn next_delay(&self, current: Duration) -> Duration {
        let max = Duration::from_millis(self.config.max_delay_ms);
        let next = current.as_secs_f64() * self.config.backoff_multiplier.max(1.0);
        // Clamp before converting: an oversized or non-finite product has no Duration.
        Duration::try_from_secs_f64(next.min(max.as_secs_f64())).unwrap_or(max)
    }
}

#[async_trait]
impl Fetcher for RetryingFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut delay = Duration::from_millis(self.config.initial_delay_ms);
        let mut attempt = 1;

        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < max_attempts && e.is_retryable() => {
                    tracing::warn!(
                        "Fetch of {} failed (attempt {}/{}): {}; retrying in {:?}",
                        url,
                        attempt,
                        max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = self.next_delay(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
