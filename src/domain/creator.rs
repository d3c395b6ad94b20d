use std::fmt;

use url::Url;

use crate::app::{FedimageError, Result};

/// Stable identifier for a followed account, `handle@host`.
///
/// Used as the dedup namespace and as the stem of the cached feed file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CreatorKey(String);

impl CreatorKey {
    pub fn new(handle: &str, host: &str) -> Self {
        Self(format!("{}@{}", handle, host))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the cached feed document for this creator.
    pub fn feed_filename(&self) -> String {
        format!("{}.rss", self.0)
    }
}

impl fmt::Display for CreatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CreatorKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A feed URL of the form `scheme://host/@handle`, optionally ending in `.rss`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedUrl {
    pub url: String,
    pub creator: CreatorKey,
}

impl FeedUrl {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let invalid = || FedimageError::InvalidFeedUrl(raw.to_string());

        let parsed = Url::parse(raw).map_err(|_| invalid())?;
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(invalid)?;

        let handle = parsed
            .path()
            .trim_end_matches('/')
            .strip_prefix("/@")
            .map(|h| h.strip_suffix(".rss").unwrap_or(h))
            .filter(|h| !h.is_empty() && !h.contains('/'))
            .ok_or_else(invalid)?;

        Ok(Self {
            url: raw.to_string(),
            creator: CreatorKey::new(handle, host),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creator_key_from_plain_feed_url() {
        let feed = FeedUrl::parse("https://mastodon.social/@alice").unwrap();
        assert_eq!(feed.creator.as_str(), "alice@mastodon.social");
        assert_eq!(feed.url, "https://mastodon.social/@alice");
    }

    #[test]
    fn test_creator_key_ignores_rss_extension() {
        let feed = FeedUrl::parse("https://misskey.io/@bob.rss\n").unwrap();
        assert_eq!(feed.creator.as_str(), "bob@misskey.io");
        assert_eq!(feed.creator.feed_filename(), "bob@misskey.io.rss");
        assert_eq!(feed.url, "https://misskey.io/@bob.rss");
    }

    #[test]
    fn test_rejects_urls_without_handle() {
        assert!(matches!(
            FeedUrl::parse("https://example.com/alice"),
            Err(FedimageError::InvalidFeedUrl(_))
        ));
        assert!(FeedUrl::parse("https://example.com/@").is_err());
        assert!(FeedUrl::parse("https://example.com/@alice/media").is_err());
        assert!(FeedUrl::parse("not a url").is_err());
    }
}
