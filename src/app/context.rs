use std::sync::Arc;

use crate::app::Result;
use crate::config::{Config, DataPaths};
use crate::fetcher::{Fetcher, HttpFetcher, RetryingFetcher};
use crate::store::SqliteStore;
use crate::sync::FeedSyncDriver;

pub struct AppContext {
    pub config: Config,
    pub paths: DataPaths,
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
}

impl AppContext {
    /// Resolve data paths, create the download and feed directories, open the
    /// dedup database and build the retrying HTTP fetcher.
    pub fn new(config: Config) -> Result<Self> {
        let paths = config.storage.resolve()?;
        paths.ensure_dirs()?;

        let store = Arc::new(SqliteStore::new(&paths.database)?);
        let http: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(&config.http)?);
        let fetcher: Arc<dyn Fetcher + Send + Sync> =
            Arc::new(RetryingFetcher::new(http, config.retry.clone()));

        Ok(Self {
            config,
            paths,
            store,
            fetcher,
        })
    }

    pub fn sync_driver(&self) -> FeedSyncDriver {
        FeedSyncDriver::new(
            self.fetcher.clone(),
            self.store.clone(),
            &self.paths,
            &self.config.sync,
        )
    }
}
