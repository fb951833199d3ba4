use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::metrics::CalibrationExample;

/// Read a JSON array of labeled cases.
///
/// Accepts both `{"input": {...}, "expected_output": n}` and the legacy
/// field names (`trip_duration_days`, `miles_traveled`,
/// `total_receipts_amount`).
pub fn load_cases(path: &Path) -> Result<Vec<CalibrationExample>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read cases file: {}", path.display()))?;
    parse_cases(&contents)
        .with_context(|| format!("Failed to parse cases file: {}", path.display()))
}

pub fn parse_cases(contents: &str) -> Result<Vec<CalibrationExample>> {
    let cases: Vec<CalibrationExample> = serde_json::from_str(contents)?;
    tracing::debug!(count = cases.len(), "loaded labeled cases");
    Ok(cases)
}
