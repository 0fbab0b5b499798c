//! Command handlers.
//!
//! Handlers write their results to the supplied writer; diagnostics go
//! through `tracing`.

pub mod config;
pub mod eval;
pub mod metrics;
pub mod settings;

use std::io::Write;

use anyhow::Result;

use adsight_client::SettingsSyncClient;

use crate::cli::{Cli, Command, ConfigAction, SettingsAction};
use crate::config::AdsightConfig;

/// Run the parsed command line against `config`.
pub async fn dispatch(cli: Cli, config: AdsightConfig, out: &mut impl Write) -> Result<()> {
    match cli.command {
        Command::Settings { action } => match action {
            SettingsAction::Paths => settings::paths(out),
            SettingsAction::Fetch { account } => {
                settings::fetch(&sync_client(&config)?, &account, out).await
            }
            SettingsAction::Get {
                account,
                path,
                default,
            } => {
                settings::get(
                    &sync_client(&config)?,
                    &account,
                    &path,
                    default.as_deref(),
                    out,
                )
                .await
            }
            SettingsAction::Set {
                account,
                path,
                value,
            } => settings::set(&sync_client(&config)?, &account, &path, &value, out).await,
        },
        Command::Eval {
            expression,
            row,
            strict,
        } => eval::run(&expression, &eval::read_row(&row)?, strict, out),
        Command::Metrics { row, account } => {
            let row = eval::read_row(&row)?;
            match account {
                Some(account) => {
                    metrics::for_account(&sync_client(&config)?, &account, &row, out).await
                }
                None => metrics::standard(&row, out),
            }
        }
        Command::Config { action } => match action {
            ConfigAction::Path => config::path(cli.config.as_deref(), out),
            ConfigAction::Init { force } => config::init(cli.config.as_deref(), force, out),
            ConfigAction::Show => config::show(&config, out),
        },
    }
}

/// HTTP sync client configured from `config`.
pub fn sync_client(config: &AdsightConfig) -> Result<SettingsSyncClient> {
    Ok(SettingsSyncClient::from_config(&config.server)?.with_rollback(config.rollback_policy()))
}
