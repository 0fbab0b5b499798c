//! Registry of every known account setting.
//!
//! Each constant is a typed lens; [`KNOWN_PATHS`] lists the same paths for
//! callers that only have a string (CLI input, UI field ids).

use serde::{Deserialize, Serialize};

use crate::setting::Setting;

/// A user-defined metric computed from row fields by an expression.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetricDef {
    /// Stable key, e.g. `roas`.
    pub key: String,
    /// Display label, e.g. `ROAS`.
    pub label: String,
    /// Formula in the metric expression grammar.
    pub expression: String,
}

impl DerivedMetricDef {
    /// Convenience constructor.
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            expression: expression.into(),
        }
    }
}

// ============================================================================
// Display
// ============================================================================

/// ISO currency code used for monetary values.
pub const DISPLAY_CURRENCY: Setting<String> = Setting::new("display.currency");
/// Default date range preset, e.g. `last_30_days`.
pub const DISPLAY_DATE_RANGE: Setting<String> = Setting::new("display.dateRange");
/// Abbreviate large numbers (`1.2k`).
pub const DISPLAY_COMPACT_NUMBERS: Setting<bool> = Setting::new("display.compactNumbers");

// ============================================================================
// Overview sections
// ============================================================================

/// Metrics pinned to the Google Ads overview.
pub const GOOGLE_PINNED_METRICS: Setting<Vec<String>> =
    Setting::new("sections.overviews.google.pinnedMetrics");
/// Whether the Google Ads overview is shown.
pub const GOOGLE_VISIBLE: Setting<bool> = Setting::new("sections.overviews.google.visible");
/// Metrics pinned to the Meta overview.
pub const META_PINNED_METRICS: Setting<Vec<String>> =
    Setting::new("sections.overviews.meta.pinnedMetrics");
/// Whether the Meta overview is shown.
pub const META_VISIBLE: Setting<bool> = Setting::new("sections.overviews.meta.visible");
/// Metrics pinned to the TikTok overview.
pub const TIKTOK_PINNED_METRICS: Setting<Vec<String>> =
    Setting::new("sections.overviews.tiktok.pinnedMetrics");
/// Whether the TikTok overview is shown.
pub const TIKTOK_VISIBLE: Setting<bool> = Setting::new("sections.overviews.tiktok.visible");

// ============================================================================
// Goals & metrics
// ============================================================================

/// Target return on ad spend.
pub const GOALS_ROAS_TARGET: Setting<f64> = Setting::new("goals.roasTarget");
/// Target cost per acquisition.
pub const GOALS_CPA_TARGET: Setting<f64> = Setting::new("goals.cpaTarget");
/// Account-specific derived metric formulas.
pub const METRICS_DERIVED: Setting<Vec<DerivedMetricDef>> = Setting::new("metrics.derived");

/// Every registered path, in declaration order.
pub const KNOWN_PATHS: &[&str] = &[
    "display.currency",
    "display.dateRange",
    "display.compactNumbers",
    "sections.overviews.google.pinnedMetrics",
    "sections.overviews.google.visible",
    "sections.overviews.meta.pinnedMetrics",
    "sections.overviews.meta.visible",
    "sections.overviews.tiktok.pinnedMetrics",
    "sections.overviews.tiktok.visible",
    "goals.roasTarget",
    "goals.cpaTarget",
    "metrics.derived",
];

/// Whether `path` names a registered setting.
pub fn is_known(path: &str) -> bool {
    KNOWN_PATHS.contains(&path)
}
