//! Configuration management for fedimage.
//!
//! Configuration is read from `~/.config/fedimage/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app::FedimageError;
use crate::downloader::FilenameLayout;
use crate::parser::AttributionPolicy;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub http: HttpConfig,
    pub retry: RetryConfig,
    pub sync: SyncConfig,
}

/// Where feeds, media and the dedup database live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory (default: `<data dir>/fedimage`)
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("fedimage/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per fetch, including the first (default: 3)
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Feeds processed concurrently (default: 1, strictly sequential)
    pub workers: usize,
    /// Keep going with the next feed when one fails (default: true)
    pub continue_on_error: bool,
    pub attribution: AttributionPolicy,
    pub filename_layout: FilenameLayout,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            continue_on_error: true,
            attribution: AttributionPolicy::Strict,
            filename_layout: FilenameLayout::Flat,
        }
    }
}

/// Resolved on-disk locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub downloads: PathBuf,
    pub feeds: PathBuf,
    pub feeds_file: PathBuf,
    pub database: PathBuf,
}

impl DataPaths {
    pub fn under(root: &Path) -> Self {
        Self {
            downloads: root.join("downloads"),
            feeds: root.join("feeds"),
            feeds_file: root.join("feeds.txt"),
            database: root.join("fedimage.db"),
        }
    }

    /// Create the download and feed-cache directories if missing.
    pub fn ensure_dirs(&self) -> crate::app::Result<()> {
        for dir in [&self.downloads, &self.feeds] {
            fs::create_dir_all(dir).map_err(|e| FedimageError::filesystem(dir, e))?;
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn resolve(&self) -> Result<DataPaths, ConfigError> {
        let root = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .ok_or(ConfigError::NoDataDir)?
                .join("fedimage"),
        };
        Ok(DataPaths::under(&root))
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/fedimage/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("fedimage").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# fedimage configuration

[storage]
# Root for downloads/, feeds/, feeds.txt and fedimage.db.
# Defaults to the platform data directory (e.g. ~/.local/share/fedimage).
# data_dir = "/srv/fedimage"

[http]
# Timeout for each feed or media request, in seconds
timeout_secs = 30

[retry]
# Attempts per request, including the first one
max_attempts = 3
initial_delay_ms = 500
max_delay_ms = 10000
backoff_multiplier = 2.0

[sync]
# Number of feeds synced at the same time
workers = 1

# Log a failed feed and move on, instead of aborting the run
continue_on_error = true

# "strict": a media item without a source link fails the feed
# "lenient": such items are skipped with a warning
attribution = "strict"

# "flat": every file goes straight into downloads/
# "per_creator": downloads/<handle>@<host>/<file>
filename_layout = "flat"
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
