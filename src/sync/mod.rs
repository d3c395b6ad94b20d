//! Feed sync: fetch each feed, cache it, parse it and download its media.

use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::app::{FedimageError, Result};
use crate::config::{DataPaths, SyncConfig};
use crate::domain::{CreatorKey, FeedUrl};
use crate::downloader::{DownloadOutcome, MediaDownloader};
use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::store::DedupStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedReport {
    pub creator: CreatorKey,
    pub downloaded: usize,
    pub skipped: usize,
    /// Media dropped for lack of a source link
    pub unattributed: usize,
}

impl FeedReport {
    fn new(creator: CreatorKey) -> Self {
        Self {
            creator,
            downloaded: 0,
            skipped: 0,
            unattributed: 0,
        }
    }
}

#[derive(Debug)]
pub struct FeedFailure {
    pub url: String,
    pub error: FedimageError,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub feeds: Vec<FeedReport>,
    pub failures: Vec<FeedFailure>,
}

impl SyncReport {
    pub fn downloaded(&self) -> usize {
        self.feeds.iter().map(|f| f.downloaded).sum()
    }

    pub fn skipped(&self) -> usize {
        self.feeds.iter().map(|f| f.skipped).sum()
    }
}

pub struct FeedSyncDriver {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    store: Arc<dyn DedupStore + Send + Sync>,
    parser: FeedParser,
    downloader: MediaDownloader,
    feed_dir: PathBuf,
    workers: usize,
    continue_on_error: bool,
}

impl FeedSyncDriver {
    pub fn new(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        store: Arc<dyn DedupStore + Send + Sync>,
        paths: &DataPaths,
        config: &SyncConfig,
    ) -> Self {
        let downloader = MediaDownloader::new(
            fetcher.clone(),
            store.clone(),
            paths.downloads.clone(),
            config.filename_layout,
        );

        Self {
            fetcher,
            store,
            parser: FeedParser::new(config.attribution),
            downloader,
            feed_dir: paths.feeds.clone(),
            workers: config.workers.max(1),
            continue_on_error: config.continue_on_error,
        }
    }

    /// Sync every feed, up to `workers` at a time.
    ///
    /// Feed failures are collected in the report when `continue_on_error` is
    /// set; fatal errors always abort the run.
    pub async fn sync_all(&self, feeds: &[FeedUrl]) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        let mut results = stream::iter(feeds)
            .map(|feed| async move { (feed, self.sync_feed(feed).await) })
            .buffered(self.workers);

        while let Some((feed, result)) = results.next().await {
            match result {
                Ok(feed_report) => report.feeds.push(feed_report),
                Err(e) if e.is_fatal() || !self.continue_on_error => return Err(e),
                Err(e) => {
                    tracing::error!("Failed to sync {}: {}", feed.url, e);
                    report.failures.push(FeedFailure {
                        url: feed.url.clone(),
                        error: e,
                    });
                }
            }
        }

        Ok(report)
    }

    pub async fn sync_feed(&self, feed: &FeedUrl) -> Result<FeedReport> {
        tracing::info!("Fetching feed from {}", feed.url);
        let body = self.fetcher.fetch(&feed.url).await?;

        let cache_path = self.feed_dir.join(feed.creator.feed_filename());
        tokio::fs::write(&cache_path, &body)
            .await
            .map_err(|e| FedimageError::filesystem(&cache_path, e))?;

        tracing::info!("Checking for media from {}", feed.creator);
        self.store.ensure_namespace(&feed.creator)?;

        let document = String::from_utf8_lossy(&body);
        let parsed = self.parser.parse(&feed.creator, &document);

        let mut report = FeedReport::new(feed.creator.clone());
        for media_url in &parsed.unattributed {
            tracing::warn!("Skipping {} from {}: no source link", media_url, feed.creator);
        }
        report.unattributed = parsed.unattributed.len();

        for item in &parsed.items {
            match self.downloader.download(item).await? {
                DownloadOutcome::Skipped => report.skipped += 1,
                DownloadOutcome::Downloaded { .. } => report.downloaded += 1,
            }
        }

        tracing::info!(
            "{}: {} downloaded, {} skipped",
            feed.creator,
            report.downloaded,
            report.skipped
        );

        // Items before the failing one are downloaded; the feed still fails.
        match parsed.error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::mock::StaticFetcher;
    use crate::parser::AttributionPolicy;
    use crate::store::SqliteStore;

    const ALICE_FEED: &str = "https://a.example/@alice.rss";
    const BOB_FEED: &str = "https://b.example/@bob";

    const ALICE_DOC: &str = r#"<rss version="2.0">
  <channel>
    <item>
      <link>https://a.example/@alice/1</link>
      <enclosure url="https://a.example/media/one.png" length="3" type="image/png"/>
    </item>
    <item>
      <link>https://a.example/@alice/2</link>
      <title>text only</title>
    </item>
    <item>
      <link><![CDATA[https://a.example/@alice/3]]></link>
      <media:content url="https://a.example/media/two.jpg" type="image/jpeg" fileSize="3" medium="image">
      </media:content>
    </item>
  </channel>
</rss>"#;

    const BOB_DOC: &str = r#"<rss version="2.0">
  <channel>
    <item>
      <link>https://b.example/@bob/7</link>
      <enclosure url="https://b.example/files/three.gif" length="3" type="image/gif"/>
    </item>
  </channel>
</rss>"#;

    const UNATTRIBUTED_DOC: &str = r#"<rss version="2.0">
  <channel>
    <item>
      <enclosure url="https://b.example/files/orphan.gif" length="3" type="image/gif"/>
    </item>
    <item>
      <link>https://b.example/@bob/7</link>
      <enclosure url="https://b.example/files/three.gif" length="3" type="image/gif"/>
    </item>
  </channel>
</rss>"#;

    const LATE_UNATTRIBUTED_DOC: &str = r#"<rss version="2.0">
  <channel>
    <item>
      <link>https://b.example/@bob/8</link>
      <enclosure url="https://b.example/files/good.gif" length="3" type="image/gif"/>
    </item>
    <item>
      <enclosure url="https://b.example/files/orphan.gif" length="3" type="image/gif"/>
    </item>
  </channel>
</rss>"#;

    struct Harness {
        root: tempfile::TempDir,
        paths: DataPaths,
        fetcher: Arc<StaticFetcher>,
        store: Arc<SqliteStore>,
    }

    impl Harness {
        fn new(fetcher: StaticFetcher) -> Self {
            let root = tempfile::tempdir().unwrap();
            let paths = DataPaths::under(root.path());
            paths.ensure_dirs().unwrap();
            Self {
                root,
                paths,
                fetcher: Arc::new(fetcher),
                store: Arc::new(SqliteStore::in_memory().unwrap()),
            }
        }

        fn driver(&self, config: &SyncConfig) -> FeedSyncDriver {
            FeedSyncDriver::new(self.fetcher.clone(), self.store.clone(), &self.paths, config)
        }
    }

    fn feeds(urls: &[&str]) -> Vec<FeedUrl> {
        urls.iter().map(|u| FeedUrl::parse(u).unwrap()).collect()
    }

    fn full_fetcher(bob_doc: &str) -> StaticFetcher {
        StaticFetcher::new()
            .with_body(ALICE_FEED, ALICE_DOC)
            .with_body(BOB_FEED, bob_doc)
            .with_body("https://a.example/media/one.png", "one")
            .with_body("https://a.example/media/two.jpg", "two")
            .with_body("https://b.example/files/three.gif", "three")
    }

    #[tokio::test]
    async fn test_second_run_downloads_nothing() {
        let h = Harness::new(full_fetcher(BOB_DOC));
        let driver = h.driver(&SyncConfig::default());
        let feeds = feeds(&[ALICE_FEED, BOB_FEED]);

        let first = driver.sync_all(&feeds).await.unwrap();
        assert_eq!(first.downloaded(), 3);
        assert_eq!(first.skipped(), 0);
        assert!(first.failures.is_empty());

        let second = driver.sync_all(&feeds).await.unwrap();
        assert_eq!(second.downloaded(), 0);
        assert_eq!(second.skipped(), 3);

        assert_eq!(h.fetcher.hits("https://a.example/media/one.png"), 1);
        assert_eq!(h.fetcher.hits(ALICE_FEED), 2);
        assert_eq!(
            std::fs::read_to_string(h.paths.downloads.join("two.jpg.txt")).unwrap(),
            "creator:alice@a.example\nsource:https://a.example/@alice/3"
        );
    }

    #[tokio::test]
    async fn test_feed_document_is_cached_verbatim() {
        let h = Harness::new(full_fetcher(BOB_DOC));
        let driver = h.driver(&SyncConfig::default());

        driver.sync_feed(&feeds(&[BOB_FEED])[0]).await.unwrap();

        let cached = h.root.path().join("feeds").join("bob@b.example.rss");
        assert_eq!(std::fs::read_to_string(cached).unwrap(), BOB_DOC);
    }

    #[tokio::test]
    async fn test_failed_feed_does_not_stop_the_next() {
        let fetcher = StaticFetcher::new()
            .with_body(BOB_FEED, BOB_DOC)
            .with_body("https://b.example/files/three.gif", "three");
        let h = Harness::new(fetcher);
        let driver = h.driver(&SyncConfig::default());

        let report = driver
            .sync_all(&feeds(&[ALICE_FEED, BOB_FEED]))
            .await
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].url, ALICE_FEED);
        assert!(matches!(
            report.failures[0].error,
            FedimageError::FetchStatus { status: 404, .. }
        ));
        assert_eq!(report.feeds.len(), 1);
        assert_eq!(report.downloaded(), 1);
    }

    #[tokio::test]
    async fn test_fail_fast_aborts_on_first_failure() {
        let h = Harness::new(full_fetcher(BOB_DOC).with_status(ALICE_FEED, 500));
        let config = SyncConfig {
            continue_on_error: false,
            ..SyncConfig::default()
        };

        // The queued body is served first, then the 500 sticks.
        let driver = h.driver(&config);
        driver.sync_all(&feeds(&[ALICE_FEED])).await.unwrap();

        let err = driver
            .sync_all(&feeds(&[ALICE_FEED, BOB_FEED]))
            .await
            .unwrap_err();
        assert!(matches!(err, FedimageError::FetchStatus { status: 500, .. }));
        assert_eq!(h.fetcher.hits(BOB_FEED), 0);
    }

    #[tokio::test]
    async fn test_strict_attribution_fails_only_that_feed() {
        let h = Harness::new(full_fetcher(UNATTRIBUTED_DOC));
        let driver = h.driver(&SyncConfig::default());

        let report = driver
            .sync_all(&feeds(&[BOB_FEED, ALICE_FEED]))
            .await
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            FedimageError::MissingAttribution { .. }
        ));
        assert_eq!(h.fetcher.hits("https://b.example/files/three.gif"), 0);
        assert_eq!(report.downloaded(), 2);
    }

    #[tokio::test]
    async fn test_strict_attribution_keeps_items_before_failure() {
        let h = Harness::new(
            full_fetcher(LATE_UNATTRIBUTED_DOC)
                .with_body("https://b.example/files/good.gif", "good"),
        );
        let driver = h.driver(&SyncConfig::default());

        let report = driver.sync_all(&feeds(&[BOB_FEED])).await.unwrap();

        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            FedimageError::MissingAttribution { .. }
        ));
        assert_eq!(h.fetcher.hits("https://b.example/files/good.gif"), 1);
        assert_eq!(h.fetcher.hits("https://b.example/files/orphan.gif"), 0);
        assert!(h
            .store
            .exists(
                &CreatorKey::new("bob", "b.example"),
                "https://b.example/files/good.gif"
            )
            .unwrap());
        assert_eq!(
            std::fs::read(h.paths.downloads.join("good.gif")).unwrap(),
            b"good"
        );
    }

    #[tokio::test]
    async fn test_lenient_attribution_skips_item() {
        let h = Harness::new(full_fetcher(UNATTRIBUTED_DOC));
        let config = SyncConfig {
            attribution: AttributionPolicy::Lenient,
            ..SyncConfig::default()
        };
        let driver = h.driver(&config);

        let report = driver.sync_all(&feeds(&[BOB_FEED])).await.unwrap();

        assert_eq!(report.feeds[0].unattributed, 1);
        assert_eq!(report.feeds[0].downloaded, 1);
        assert_eq!(h.fetcher.hits("https://b.example/files/orphan.gif"), 0);
    }

    #[tokio::test]
    async fn test_parallel_workers_report_in_feed_order() {
        let h = Harness::new(full_fetcher(BOB_DOC));
        let config = SyncConfig {
            workers: 4,
            ..SyncConfig::default()
        };
        let driver = h.driver(&config);

        let report = driver
            .sync_all(&feeds(&[BOB_FEED, ALICE_FEED]))
            .await
            .unwrap();

        let creators: Vec<_> = report.feeds.iter().map(|f| f.creator.as_str()).collect();
        assert_eq!(creators, vec!["bob@b.example", "alice@a.example"]);
        assert_eq!(report.downloaded(), 3);
    }

    #[tokio::test]
    async fn test_filesystem_errors_abort_even_when_continuing() {
        let h = Harness::new(full_fetcher(BOB_DOC));
        std::fs::remove_dir_all(&h.paths.feeds).unwrap();
        let driver = h.driver(&SyncConfig::default());

        let err = driver
            .sync_all(&feeds(&[ALICE_FEED, BOB_FEED]))
            .await
            .unwrap_err();
        assert!(matches!(err, FedimageError::Filesystem { .. }));
    }
}
