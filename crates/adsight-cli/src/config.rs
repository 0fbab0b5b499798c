//! The `adsight` configuration file.
//!
//! ```toml
//! [server]
//! base_url = "http://localhost:3000"
//! # timeout_secs = 30
//!
//! [sync]
//! rollback_on_failure = false
//!
//! [logging]
//! # level = "debug"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use adsight_client::ClientConfig;
use adsight_core::RollbackPolicy;

/// Project directory name under the platform config dir.
pub const PROJECT_NAME: &str = "adsight";

/// Config file name.
pub const CONFIG_FILE: &str = "config.toml";

/// Everything the CLI reads from its config file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdsightConfig {
    /// Settings service connection.
    pub server: ClientConfig,
    /// Update behaviour.
    pub sync: SyncConfig,
    /// Log filtering.
    pub logging: LoggingConfig,
}

/// `[sync]` section.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Restore the previous value when an update is rejected.
    pub rollback_on_failure: bool,
}

/// `[logging]` section.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl AdsightConfig {
    /// Platform default location, e.g. `~/.config/adsight/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(PROJECT_NAME).join(CONFIG_FILE))
    }

    /// The explicit path if given, else the platform default.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        explicit.map(Path::to_path_buf).or_else(Self::default_path)
    }

    /// Load from `explicit` or the default location.
    ///
    /// A missing file yields defaults; an unreadable or malformed one is an
    /// error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let Some(path) = Self::resolve_path(explicit) else {
            tracing::debug!("no config directory on this platform, using defaults");
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply command-line overrides.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url {
            self.server.base_url = url;
        }
        self
    }

    /// The rollback policy implied by `[sync]`.
    pub fn rollback_policy(&self) -> RollbackPolicy {
        if self.sync.rollback_on_failure {
            RollbackPolicy::Revert
        } else {
            RollbackPolicy::Keep
        }
    }

    /// Serialize as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Write a default config file at `path`.
    ///
    /// Refuses to replace an existing file unless `force` is set.
    pub fn init(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!(
                "Config file already exists at {}. Use --force to overwrite.",
                path.display()
            );
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, Self::default().to_toml_string()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
