//! `adsight eval ...`

use std::io::Write;

use anyhow::{Context, Result, bail};
use serde_json::Value;

use adsight_expr::{Expression, MetricRow, evaluate};

use crate::cli::RowInput;

/// Build a row from `--row` or `--row-file`. Neither gives an empty row.
pub fn read_row(input: &RowInput) -> Result<MetricRow> {
    let raw = match (&input.row, &input.row_file) {
        (Some(json), _) => json.clone(),
        (None, Some(file)) => std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?,
        (None, None) => return Ok(MetricRow::new()),
    };
    let value: Value = serde_json::from_str(&raw).context("Row is not valid JSON")?;
    if !value.is_object() {
        bail!("Row must be a JSON object of field names to numbers");
    }
    Ok(MetricRow::from_json(&value))
}

/// Evaluate `expression` and print the number.
///
/// Lenient mode always prints a number; `strict` reports why it would be 0.
pub fn run(expression: &str, row: &MetricRow, strict: bool, out: &mut impl Write) -> Result<()> {
    let value = if strict {
        let parsed = Expression::parse(expression)
            .with_context(|| format!("Invalid expression '{expression}'"))?;
        parsed
            .eval(row)
            .with_context(|| format!("Cannot evaluate '{expression}'"))?
    } else {
        evaluate(expression, row)
    };
    writeln!(out, "{value}")?;
    Ok(())
}
