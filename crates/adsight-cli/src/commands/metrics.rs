//! `adsight metrics ...`

use std::io::Write;

use anyhow::{Context, Result};

use adsight_client::{SettingsApi, SettingsSyncClient};
use adsight_core::registry::METRICS_DERIVED;
use adsight_expr::{DerivedMetrics, MetricRow};

/// Print the built-in metrics for `row`.
pub fn standard(row: &MetricRow, out: &mut impl Write) -> Result<()> {
    print_metrics(&DerivedMetrics::standard(), row, out)
}

/// Print the built-in metrics overlaid with `account`'s own definitions.
pub async fn for_account<A: SettingsApi>(
    client: &SettingsSyncClient<A>,
    account: &str,
    row: &MetricRow,
    out: &mut impl Write,
) -> Result<()> {
    client
        .fetch_all(account)
        .await
        .with_context(|| format!("Failed to fetch settings for {account}"))?;
    let overrides = client.cache().get_setting(&METRICS_DERIVED, Vec::new());
    tracing::debug!(account, count = overrides.len(), "account metric definitions");
    print_metrics(&DerivedMetrics::with_overrides(overrides), row, out)
}

fn print_metrics(metrics: &DerivedMetrics, row: &MetricRow, out: &mut impl Write) -> Result<()> {
    let values = metrics.evaluate(row);
    let width = metrics
        .definitions()
        .map(|d| d.key.len())
        .max()
        .unwrap_or(0);
    for def in metrics.definitions() {
        let value = values.get(&def.key).copied().unwrap_or(0.0);
        writeln!(out, "{:<width$}  {value:>14.4}  {}", def.key, def.label)?;
    }
    Ok(())
}
