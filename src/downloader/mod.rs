//! Dedup-aware media download.
//!
//! Side effects for a new item happen in a fixed order: media bytes, then
//! the tag file, then the dedup record. A crash between the writes and the
//! record leaves files without a record, so the next run downloads the item
//! again and overwrites them.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::app::{FedimageError, Result};
use crate::domain::{CreatorKey, MediaItem};
use crate::fetcher::Fetcher;
use crate::store::DedupStore;

const TAG_SUFFIX: &str = ".txt";

/// How media files are placed under the download directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilenameLayout {
    /// `<download-dir>/<filename>`. Creators posting the same filename overwrite each other.
    #[default]
    Flat,
    /// `<download-dir>/<creator>/<filename>`
    PerCreator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Skipped,
    Downloaded { path: PathBuf },
}

type InFlightKey = (CreatorKey, String);

pub struct MediaDownloader {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    store: Arc<dyn DedupStore + Send + Sync>,
    download_dir: PathBuf,
    layout: FilenameLayout,
    in_flight: Mutex<HashSet<InFlightKey>>,
}

/// Exclusive right to download one `(creator, media_url)` pair; released on drop.
struct Claim<'a> {
    in_flight: &'a Mutex<HashSet<InFlightKey>>,
    key: InFlightKey,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

impl MediaDownloader {
    pub fn new(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        store: Arc<dyn DedupStore + Send + Sync>,
        download_dir: impl Into<PathBuf>,
        layout: FilenameLayout,
    ) -> Self {
        Self {
            fetcher,
            store,
            download_dir: download_dir.into(),
            layout,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub async fn download(&self, item: &MediaItem) -> Result<DownloadOutcome> {
        tracing::info!("Downloading {}", item.media_url);

        if self.store.exists(&item.creator, &item.media_url)? {
            tracing::info!("Already downloaded: {}", item.media_url);
            return Ok(DownloadOutcome::Skipped);
        }

        let Some(_claim) = self.claim(item) else {
            tracing::info!("Already in progress: {}", item.media_url);
            return Ok(DownloadOutcome::Skipped);
        };

        // Another worker may have finished between the check and the claim.
        if self.store.exists(&item.creator, &item.media_url)? {
            tracing::info!("Already downloaded: {}", item.media_url);
            return Ok(DownloadOutcome::Skipped);
        }

        let path = self.target_path(item)?;
        tracing::info!("Saving as {}", path.display());

        let bytes = self.fetcher.fetch(&item.media_url).await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FedimageError::filesystem(parent, e))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| FedimageError::filesystem(&path, e))?;

        let tag_path = tag_path(&path);
        tracing::info!("Writing tags to {}", tag_path.display());
        tokio::fs::write(&tag_path, item.tag_contents())
            .await
            .map_err(|e| FedimageError::filesystem(&tag_path, e))?;

        self.store.record(&item.creator, &item.media_url)?;

        Ok(DownloadOutcome::Downloaded { path })
    }

    pub fn target_path(&self, item: &MediaItem) -> Result<PathBuf> {
        let filename = item.filename()?;
        Ok(match self.layout {
            FilenameLayout::Flat => self.download_dir.join(filename),
            FilenameLayout::PerCreator => self
                .download_dir
                .join(item.creator.as_str())
                .join(filename),
        })
    }

    fn claim(&self, item: &MediaItem) -> Option<Claim<'_>> {
        let key = (item.creator.clone(), item.media_url.clone());
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());

        if !in_flight.insert(key.clone()) {
            return None;
        }

        Some(Claim {
            in_flight: &self.in_flight,
            key,
        })
    }
}

/// Sidecar path: the media path with `.txt` appended.
pub fn tag_path(media_path: &Path) -> PathBuf {
    let mut path = OsString::from(media_path.as_os_str());
    path.push(TAG_SUFFIX);
    PathBuf::from(path)
}
