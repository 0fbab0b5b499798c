//! Derived metrics: named expressions compiled once, evaluated per row.

use std::collections::BTreeMap;

use adsight_core::DerivedMetricDef;

use crate::error::ExprError;
use crate::eval::{Expression, MetricRow};

/// The built-in marketing formulas.
pub fn standard_definitions() -> Vec<DerivedMetricDef> {
    vec![
        DerivedMetricDef::new("roas", "ROAS", "SAFE_DIVIDE(revenue, spend)"),
        DerivedMetricDef::new("ctr", "CTR (%)", "SAFE_DIVIDE(clicks, impressions) * 100"),
        DerivedMetricDef::new("cpc", "CPC", "SAFE_DIVIDE(spend, clicks)"),
        DerivedMetricDef::new("cpa", "CPA", "SAFE_DIVIDE(spend, conversions)"),
        DerivedMetricDef::new("cpm", "CPM", "SAFE_DIVIDE(spend, impressions) * 1000"),
        DerivedMetricDef::new(
            "conversionRate",
            "Conversion rate (%)",
            "SAFE_DIVIDE(conversions, clicks) * 100",
        ),
    ]
}

struct CompiledMetric {
    def: DerivedMetricDef,
    compiled: Result<Expression, ExprError>,
}

/// A set of compiled metric definitions.
///
/// Definitions that fail to parse are kept; they evaluate to `0`.
pub struct DerivedMetrics {
    metrics: Vec<CompiledMetric>,
}

impl DerivedMetrics {
    /// Compile `defs`. A later definition with the same key replaces an
    /// earlier one, keeping the earlier position.
    pub fn compile(defs: impl IntoIterator<Item = DerivedMetricDef>) -> Self {
        let mut metrics: Vec<CompiledMetric> = Vec::new();
        for def in defs {
            let compiled = Expression::parse(&def.expression);
            if let Err(e) = &compiled {
                tracing::warn!(metric = %def.key, error = %e, "derived metric does not parse");
            }
            let metric = CompiledMetric { def, compiled };
            match metrics.iter_mut().find(|m| m.def.key == metric.def.key) {
                Some(existing) => *existing = metric,
                None => metrics.push(metric),
            }
        }
        Self { metrics }
    }

    /// The built-in formulas.
    pub fn standard() -> Self {
        Self::compile(standard_definitions())
    }

    /// The built-ins overlaid with account-defined metrics.
    pub fn with_overrides(overrides: impl IntoIterator<Item = DerivedMetricDef>) -> Self {
        Self::compile(standard_definitions().into_iter().chain(overrides))
    }

    /// Definitions in evaluation order.
    pub fn definitions(&self) -> impl Iterator<Item = &DerivedMetricDef> {
        self.metrics.iter().map(|m| &m.def)
    }

    /// Definitions whose expression failed to parse.
    pub fn invalid(&self) -> impl Iterator<Item = (&DerivedMetricDef, &ExprError)> {
        self.metrics
            .iter()
            .filter_map(|m| m.compiled.as_ref().err().map(|e| (&m.def, e)))
    }

    /// Compute every metric for `row`, keyed by metric key.
    pub fn evaluate(&self, row: &MetricRow) -> BTreeMap<String, f64> {
        self.metrics
            .iter()
            .map(|m| {
                let value = match &m.compiled {
                    Ok(expr) => expr.eval_or_zero(row),
                    Err(_) => 0.0,
                };
                (m.def.key.clone(), value)
            })
            .collect()
    }
}
