//! The feed URL list and its generation from an exported account roster.

use std::fs;
use std::path::Path;

use crate::app::{FedimageError, Result};
use crate::domain::FeedUrl;

/// Read the newline-delimited feed URL list.
///
/// Blank lines and `#` comments are ignored; lines that are not feed URLs
/// are logged and skipped.
pub fn read_feed_list(path: &Path) -> Result<Vec<FeedUrl>> {
    let content = fs::read_to_string(path).map_err(|e| FedimageError::filesystem(path, e))?;
    Ok(parse_feed_list(&content))
}

pub fn parse_feed_list(content: &str) -> Vec<FeedUrl> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| match FeedUrl::parse(line) {
            Ok(feed) => Some(feed),
            Err(e) => {
                tracing::warn!("Skipping feed list entry: {}", e);
                None
            }
        })
        .collect()
}

/// Convert a Mastodon "follows" CSV export into feed URLs.
///
/// The first line is a header. Each row starts with `user@host`.
pub fn roster_to_feed_urls(csv: &str) -> Vec<String> {
    csv.lines()
        .skip(1)
        .map(str::trim)
        .filter(|row| !row.is_empty())
        .filter_map(|row| {
            let account = row.split(',').next().unwrap_or_default().trim();
            let account = account.strip_prefix('@').unwrap_or(account);

            match account.split_once('@') {
                Some((user, host)) if !user.is_empty() && !host.is_empty() => {
                    Some(format!("https://{}/@{}.rss", host, user))
                }
                _ => {
                    tracing::warn!("Skipping roster row without an account address: {}", row);
                    None
                }
            }
        })
        .collect()
}

/// Regenerate the feed list file from a roster CSV. Returns the number of feeds written.
pub fn generate_feed_list(roster: &Path, feeds_file: &Path) -> Result<usize> {
    tracing::info!("Generating feed list from {}", roster.display());

    let csv = fs::read_to_string(roster).map_err(|e| FedimageError::filesystem(roster, e))?;
    let urls = roster_to_feed_urls(&csv);

    fs::write(feeds_file, urls.join("\n"))
        .map_err(|e| FedimageError::filesystem(feeds_file, e))?;

    Ok(urls.len())
}
