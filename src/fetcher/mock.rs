use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::{FedimageError, Result};
use crate::fetcher::Fetcher;

#[derive(Debug, Clone)]
enum Reply {
    Body(Vec<u8>),
    Status(u16),
}

/// Serves canned replies per URL and counts requests.
///
/// Replies queued for a URL are served in order; the last one repeats.
/// Unknown URLs answer 404.
#[derive(Default)]
pub(crate) struct StaticFetcher {
    replies: Mutex<HashMap<String, Vec<Reply>>>,
    hits: Mutex<HashMap<String, usize>>,
}

impl StaticFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_body(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.push(url, Reply::Body(body.into()));
        self
    }

    pub(crate) fn with_status(self, url: &str, status: u16) -> Self {
        self.push(url, Reply::Status(status));
        self
    }

    pub(crate) fn hits(&self, url: &str) -> usize {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub(crate) fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }

    fn push(&self, url: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push(reply);
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        *self.hits.lock().unwrap().entry(url.to_string()).or_default() += 1;

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.remove(0),
                Some(queue) => queue[0].clone(),
                None => Reply::Status(404),
            }
        };

        match reply {
            Reply::Body(body) => Ok(body),
            Reply::Status(status) => Err(FedimageError::FetchStatus {
                url: url.to_string(),
                status,
            }),
        }
    }
}
