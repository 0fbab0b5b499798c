//! `adsight config ...`

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{AdsightConfig, PROJECT_NAME};

fn resolve(explicit: Option<&Path>) -> Result<PathBuf> {
    AdsightConfig::resolve_path(explicit)
        .context("Could not determine config directory for this platform")
}

/// Print the config file location.
pub fn path(explicit: Option<&Path>, out: &mut impl Write) -> Result<()> {
    let path = resolve(explicit)?;
    writeln!(out, "{}", path.display())?;
    if !path.exists() {
        eprintln!("(file does not exist; run `{PROJECT_NAME} config init` to create it)");
    }
    Ok(())
}

/// Create a default config file.
pub fn init(explicit: Option<&Path>, force: bool, out: &mut impl Write) -> Result<()> {
    let path = resolve(explicit)?;
    AdsightConfig::init(&path, force)?;
    writeln!(out, "Config file created at {}", path.display())?;
    Ok(())
}

/// Print the effective configuration as TOML.
pub fn show(config: &AdsightConfig, out: &mut impl Write) -> Result<()> {
    write!(out, "{}", config.to_toml_string()?)?;
    Ok(())
}
