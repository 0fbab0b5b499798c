//! `adsight` entry point.

use anyhow::Result;
use clap::Parser;

use adsight_cli::{AdsightConfig, Cli, commands, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The config file can set the log level, so it is read before logging starts.
    let config = AdsightConfig::load(cli.config.as_deref())?.with_base_url(cli.base_url.clone());
    logging::init(cli.verbose, config.logging.level.as_deref());
    tracing::debug!(base_url = %config.server.base_url, "adsight starting");

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = commands::dispatch(cli, config, &mut stdout).await {
        tracing::error!("{e:#}");
        return Err(e);
    }
    Ok(())
}
