pub mod commands;

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::downloader::FilenameLayout;
use crate::parser::AttributionPolicy;

#[derive(Parser, Debug)]
#[command(name = "fedimage")]
#[command(
    about = "Download media posted by the accounts you follow on Mastodon and Misskey",
    long_about = None
)]
pub struct Cli {
    /// Account roster CSV (Mastodon follows export); regenerates feeds.txt before syncing
    pub roster: Option<PathBuf>,

    /// Config file (default: ~/.config/fedimage/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Root directory for downloads, feeds and the database
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Number of feeds synced concurrently
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Skip media without a source link instead of failing the feed
    #[arg(long)]
    pub lenient: bool,

    /// Store files under downloads/<handle>@<host>/
    #[arg(long)]
    pub per_creator: bool,

    /// Abort the run on the first feed that fails
    #[arg(long)]
    pub fail_fast: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.data_dir {
            config.storage.data_dir = Some(dir.clone());
        }
        if let Some(workers) = self.workers {
            config.sync.workers = workers;
        }
        if self.lenient {
            config.sync.attribution = AttributionPolicy::Lenient;
        }
        if self.per_creator {
            config.sync.filename_layout = FilenameLayout::PerCreator;
        }
        if self.fail_fast {
            config.sync.continue_on_error = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments() {
        let cli = Cli::try_parse_from(["fedimage"]).unwrap();
        assert!(cli.roster.is_none());

        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.sync.attribution, AttributionPolicy::Strict);
        assert!(config.sync.continue_on_error);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "fedimage",
            "following_accounts.csv",
            "--workers",
            "4",
            "--lenient",
            "--per-creator",
            "--fail-fast",
            "--data-dir",
            "/srv/fedimage",
        ])
        .unwrap();
        assert_eq!(cli.roster, Some(PathBuf::from("following_accounts.csv")));

        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.sync.workers, 4);
        assert_eq!(config.sync.attribution, AttributionPolicy::Lenient);
        assert_eq!(config.sync.filename_layout, FilenameLayout::PerCreator);
        assert!(!config.sync.continue_on_error);
        assert_eq!(config.storage.data_dir, Some(PathBuf::from("/srv/fedimage")));
    }
}
