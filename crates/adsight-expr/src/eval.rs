//! Evaluation of parsed expressions against metric rows.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ExprError, Result};
use crate::parser::{self, BinOp, Expr};

// ============================================================================
// MetricRow
// ============================================================================

/// One unit of analytics data: field name to value, where a value may be
/// absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricRow(BTreeMap<String, Option<f64>>);

impl MetricRow {
    /// An empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a present value.
    pub fn with(mut self, field: impl Into<String>, value: f64) -> Self {
        self.0.insert(field.into(), Some(value));
        self
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, field: impl Into<String>, value: Option<f64>) {
        self.0.insert(field.into(), value);
    }

    /// The field's value; `None` if missing or explicitly absent.
    pub fn get(&self, field: &str) -> Option<f64> {
        self.0.get(field).copied().flatten()
    }

    /// Number of fields, including absent ones.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build a row from a JSON object.
    ///
    /// Numbers are kept; `null`, strings, booleans and nested values become
    /// absent. A non-object value yields an empty row.
    pub fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::new();
        };
        Self(
            object
                .iter()
                .map(|(k, v)| (k.clone(), v.as_f64()))
                .collect(),
        )
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for MetricRow {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), Some(v)))
                .collect(),
        )
    }
}

// ============================================================================
// Expression
// ============================================================================

/// A parsed metric expression, reusable across rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    /// Parse an expression.
    pub fn parse(source: &str) -> Result<Self> {
        Ok(Self {
            source: source.to_string(),
            root: parser::parse(source)?,
        })
    }

    /// The source text as given.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed tree.
    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Field names referenced by the expression, sorted and deduplicated.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        self.root.collect_fields(&mut fields);
        fields.sort_unstable();
        fields.dedup();
        fields
    }

    /// Evaluate strictly against `row`.
    ///
    /// Errors when a field outside `SAFE_DIVIDE` is not a number, or when
    /// the result is not finite.
    pub fn eval(&self, row: &MetricRow) -> Result<f64> {
        let value = eval_node(&self.root, row)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ExprError::NonFinite)
        }
    }

    /// Evaluate against `row`, degrading any failure to `0`.
    pub fn eval_or_zero(&self, row: &MetricRow) -> f64 {
        self.eval(row).unwrap_or_else(|e| {
            tracing::warn!(
                expression = %self.source,
                error = %e,
                "expression evaluation failed, using 0"
            );
            0.0
        })
    }
}

impl FromStr for Expression {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn eval_node(expr: &Expr, row: &MetricRow) -> Result<f64> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Field(name) => row
            .get(name)
            .ok_or_else(|| ExprError::NotANumber {
                field: name.clone(),
            }),
        Expr::Neg(inner) => Ok(-eval_node(inner, row)?),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval_node(lhs, row)?;
            let rhs = eval_node(rhs, row)?;
            Ok(match op {
                BinOp::Add => lhs + rhs,
                BinOp::Sub => lhs - rhs,
                BinOp::Mul => lhs * rhs,
                BinOp::Div => lhs / rhs,
            })
        }
        Expr::SafeDivide {
            numerator,
            denominator,
        } => Ok(safe_divide(
            eval_node(numerator, row).ok(),
            eval_node(denominator, row).ok(),
        )),
    }
}

// ============================================================================
// Free functions
// ============================================================================

/// Division that yields `0` for a zero denominator or a non-number operand.
pub fn safe_divide(numerator: Option<f64>, denominator: Option<f64>) -> f64 {
    match (numerator, denominator) {
        (Some(n), Some(d)) if n.is_finite() && d.is_finite() && d != 0.0 => n / d,
        _ => 0.0,
    }
}

/// Evaluate `expression` against `row`.
///
/// Never fails: malformed input, missing fields and non-finite results all
/// produce `0`, with a warning logged.
pub fn evaluate(expression: &str, row: &MetricRow) -> f64 {
    match Expression::parse(expression) {
        Ok(parsed) => parsed.eval_or_zero(row),
        Err(e) => {
            tracing::warn!(expression, error = %e, "expression failed to parse, using 0");
            0.0
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
