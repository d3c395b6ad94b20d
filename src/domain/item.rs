use url::Url;

use crate::app::{FedimageError, Result};
use crate::domain::CreatorKey;

/// A media reference discovered in a feed, with its attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub creator: CreatorKey,
    /// URL of the post the media was attached to
    pub source: String,
    pub media_url: String,
}

impl MediaItem {
    pub fn new(creator: CreatorKey, source: impl Into<String>, media_url: impl Into<String>) -> Self {
        Self {
            creator,
            source: source.into(),
            media_url: media_url.into(),
        }
    }

    pub fn filename(&self) -> Result<String> {
        media_filename(&self.media_url)
    }

    /// Contents of the sidecar tag file. No trailing newline.
    pub fn tag_contents(&self) -> String {
        format!("creator:{}\nsource:{}", self.creator, self.source)
    }
}

/// Final `/`-delimited path segment of a media URL, excluding query and fragment.
pub fn media_filename(media_url: &str) -> Result<String> {
    let url =
        Url::parse(media_url).map_err(|_| FedimageError::InvalidMediaUrl(media_url.to_string()))?;

    url.path_segments()
        .and_then(|segments| segments.last())
        .filter(|segment| !segment.is_empty())
        .map(String::from)
        .ok_or_else(|| FedimageError::InvalidMediaUrl(media_url.to_string()))
}
