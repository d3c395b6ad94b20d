use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fedimage::app::AppContext;
use fedimage::cli::{commands, Cli};
use fedimage::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    cli.apply(&mut config);

    let ctx = AppContext::new(config)?;
    commands::sync(&ctx, cli.roster.as_deref()).await?;

    Ok(())
}
