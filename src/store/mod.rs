pub mod sqlite;

use crate::app::Result;
use crate::domain::CreatorKey;

pub use sqlite::SqliteStore;

/// Per-creator record of media URLs already downloaded.
///
/// Records are append-only: nothing here deletes or rewrites one.
pub trait DedupStore {
    /// Create the creator's namespace if it does not exist yet.
    fn ensure_namespace(&self, creator: &CreatorKey) -> Result<()>;

    fn exists(&self, creator: &CreatorKey, media_url: &str) -> Result<bool>;

    /// Mark `media_url` as downloaded for `creator`.
    ///
    /// Returns `true` if the record is new, `false` if it was already present.
    fn record(&self, creator: &CreatorKey, media_url: &str) -> Result<bool>;
}
