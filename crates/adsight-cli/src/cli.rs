//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Adsight - account settings and metric expressions
#[derive(Parser, Debug)]
#[command(name = "adsight", version)]
#[command(about = "Inspect account settings and evaluate metric expressions", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Settings service base URL, overriding the config file
    #[arg(long, global = true, env = "ADSIGHT_BASE_URL")]
    pub base_url: Option<String>,

    /// Increase log verbosity
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read and write account settings
    Settings {
        /// Settings action
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Evaluate a metric expression against one row
    Eval {
        /// Expression, e.g. "SAFE_DIVIDE(revenue, spend)"
        expression: String,

        /// Row input
        #[command(flatten)]
        row: RowInput,

        /// Report parse and evaluation errors instead of printing 0
        #[arg(long)]
        strict: bool,
    },

    /// Compute derived metrics for one row
    Metrics {
        /// Row input
        #[command(flatten)]
        row: RowInput,

        /// Overlay the account's own metric definitions
        #[arg(long)]
        account: Option<String>,
    },

    /// Manage the configuration file
    Config {
        /// Config action
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// `settings` subcommands.
#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Print the resolved settings tree
    Fetch {
        /// Account id
        account: String,
    },

    /// Print the value at a dot-path
    Get {
        /// Account id
        account: String,
        /// Dot-path, e.g. display.currency
        path: String,
        /// JSON value printed when the path is absent
        #[arg(long)]
        default: Option<String>,
    },

    /// Write a value at a dot-path
    Set {
        /// Account id
        account: String,
        /// Dot-path, e.g. goals.roasTarget
        path: String,
        /// JSON value; anything that is not valid JSON is sent as a string
        value: String,
    },

    /// List registered setting paths
    Paths,
}

/// `config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the config file location
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

/// Where a metric row comes from.
#[derive(Args, Debug, Default)]
#[group(multiple = false)]
pub struct RowInput {
    /// Row as a JSON object
    #[arg(long)]
    pub row: Option<String>,

    /// File containing the row as a JSON object
    #[arg(long)]
    pub row_file: Option<PathBuf>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_settings_set() {
        let cli = Cli::try_parse_from([
            "adsight",
            "--base-url",
            "http://settings.test",
            "settings",
            "set",
            "acct-1",
            "goals.roasTarget",
            "4.5",
        ])
        .unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://settings.test"));
        match cli.command {
            Command::Settings {
                action: SettingsAction::Set { account, path, value },
            } => {
                assert_eq!(account, "acct-1");
                assert_eq!(path, "goals.roasTarget");
                assert_eq!(value, "4.5");
            }
            other => unreachable!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_eval_with_row() {
        let cli = Cli::try_parse_from([
            "adsight",
            "-vv",
            "eval",
            "a + b",
            "--row",
            r#"{"a": 1}"#,
            "--strict",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Eval { strict: true, .. }));
    }

    #[test]
    fn test_row_and_row_file_conflict() {
        let result = Cli::try_parse_from([
            "adsight",
            "metrics",
            "--row",
            "{}",
            "--row-file",
            "row.json",
        ]);
        assert!(result.is_err());
    }
}
