//! # fedimage
//!
//! Downloads the media posted by the accounts you follow on Mastodon and
//! Misskey, using each account's public RSS feed.
//!
//! ## Architecture
//!
//! ```text
//! feeds.txt → Fetcher → FeedParser → MediaDownloader → downloads/
//!                                          ↕
//!                                      DedupStore
//! ```
//!
//! Every downloaded file gets a sidecar `<file>.txt` recording the creator
//! (`handle@host`) and the post it came from. Media already recorded in the
//! dedup store for that creator is never fetched again.
//!
//! ## Quick Start
//!
//! ```bash
//! # Build feeds.txt from a Mastodon follows export, then sync
//! fedimage following_accounts.csv
//!
//! # Sync the existing feeds.txt
//! fedimage
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// fetcher and sync driver.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/fedimage/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`CreatorKey`](domain::CreatorKey): `handle@host` account identifier
/// - [`FeedUrl`](domain::FeedUrl): a followed account's feed
/// - [`MediaItem`](domain::MediaItem): a media reference with attribution
pub mod domain;

/// Media download with dedup, tag files and the in-flight guard.
pub mod downloader;

/// The feed URL list and roster conversion.
pub mod feedlist;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for fetching a URL's body
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
/// - [`RetryingFetcher`](fetcher::RetryingFetcher): exponential backoff wrapper
pub mod fetcher;

/// Line-oriented parser for the item fields Mastodon and Misskey emit.
pub mod parser;

/// Dedup persistence.
///
/// - [`DedupStore`](store::DedupStore): per-creator downloaded-media record
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

/// Feed sync driver.
pub mod sync;
