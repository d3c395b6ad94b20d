pub mod http_fetcher;
pub mod retry;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;
pub use retry::{IsRetryable, RetryingFetcher};

/// Fetches the raw body behind a URL.
///
/// Non-success responses are errors; the body is returned verbatim.
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
