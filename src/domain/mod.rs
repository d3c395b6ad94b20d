pub mod creator;
pub mod item;

pub use creator::{CreatorKey, FeedUrl};
pub use item::{media_filename, MediaItem};
