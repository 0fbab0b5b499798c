//! # adsight-cli
//!
//! The `adsight` command: inspect and edit account settings against the
//! settings service, and evaluate metric expressions locally.
//!
//! - `settings fetch|get|set|paths`
//! - `eval <expression> [--row JSON | --row-file PATH] [--strict]`
//! - `metrics [--row JSON | --row-file PATH] [--account ID]`
//! - `config path|init|show`

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;

pub use cli::Cli;
pub use config::AdsightConfig;

/// Load configuration for `cli` and run its command.
pub async fn run(cli: Cli, out: &mut impl std::io::Write) -> anyhow::Result<()> {
    let config = AdsightConfig::load(cli.config.as_deref())?.with_base_url(cli.base_url.clone());
    commands::dispatch(cli, config, out).await
}
