use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum FedimageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Fetch failed for {url}: HTTP {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("Item with media {media_url} from {creator} has no source link")]
    MissingAttribution { creator: String, media_url: String },

    #[error("Invalid feed URL: {0}")]
    InvalidFeedUrl(String),

    #[error("Invalid media URL: {0}")]
    InvalidMediaUrl(String),

    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl FedimageError {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Errors that abort the whole run rather than just the current feed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Filesystem { .. }
                | Self::Database(_)
                | Self::Migration(_)
                | Self::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FedimageError>;
