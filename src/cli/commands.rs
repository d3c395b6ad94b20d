use std::path::Path;

use crate::app::{AppContext, Result};
use crate::feedlist;
use crate::sync::SyncReport;

/// Regenerate the feed list from `roster` (if given), then sync every feed.
pub async fn sync(ctx: &AppContext, roster: Option<&Path>) -> Result<SyncReport> {
    if let Some(roster) = roster {
        let count = feedlist::generate_feed_list(roster, &ctx.paths.feeds_file)?;
        println!("Wrote {} feeds to {}", count, ctx.paths.feeds_file.display());
    }

    let feeds = feedlist::read_feed_list(&ctx.paths.feeds_file)?;
    if feeds.is_empty() {
        println!("No feeds to sync");
        return Ok(SyncReport::default());
    }

    println!("Syncing {} feeds...", feeds.len());

    let report = ctx.sync_driver().sync_all(&feeds).await?;

    for feed in &report.feeds {
        if feed.downloaded > 0 {
            println!("  {} new files from {}", feed.downloaded, feed.creator);
        }
    }
    for failure in &report.failures {
        eprintln!("  Error syncing {}: {}", failure.url, failure.error);
    }

    println!(
        "Sync complete: {} downloaded, {} already present, {} feeds failed",
        report.downloaded(),
        report.skipped(),
        report.failures.len()
    );

    Ok(report)
}
