use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;
use crate::scoring::{Engine, InputRecord};

/// Number of worst cases kept in an [`Evaluation`].
const WORST_CASES: usize = 5;

/// A labeled case: the record and the amount the legacy system produced.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct CalibrationExample {
    pub input: InputRecord,
    pub expected_output: f64,
}

impl CalibrationExample {
    pub fn new(input: InputRecord, expected_output: f64) -> Self {
        Self {
            input,
            expected_output,
        }
    }
}

/// Match tolerances. A case is an exact match when `|error| ≤ exact` and a
/// close match when `|error| ≤ close`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Tolerances {
    #[serde(default = "default_exact")]
    pub exact: f64,
    #[serde(default = "default_close")]
    pub close: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            exact: default_exact(),
            close: default_close(),
        }
    }
}

fn default_exact() -> f64 {
    0.01
}

fn default_close() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseError {
    pub index: usize,
    pub input: InputRecord,
    pub expected: f64,
    pub actual: f64,
}

impl CaseError {
    /// Signed error, `actual - expected`.
    pub fn error(&self) -> f64 {
        self.actual - self.expected
    }

    pub fn abs_error(&self) -> f64 {
        self.error().abs()
    }
}

/// Aggregate accuracy of an engine over a labeled set.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub count: usize,
    pub mean_absolute_error: f64,
    pub median_absolute_error: f64,
    pub max_absolute_error: f64,
    pub exact_match_count: usize,
    pub close_match_count: usize,
    /// Mean of `|error| / expected` as a fraction. Cases with a non-positive
    /// expected amount count as 0, which under-penalizes them.
    pub mean_percent_error: f64,
    /// Largest absolute errors, worst first.
    pub worst: Vec<CaseError>,
}

impl Evaluation {
    pub fn exact_match_rate(&self) -> f64 {
        self.exact_match_count as f64 / self.count as f64
    }

    pub fn close_match_rate(&self) -> f64 {
        self.close_match_count as f64 / self.count as f64
    }
}

/// Reject sets calibration cannot use: empty, or with non-finite values.
pub fn check_examples(examples: &[CalibrationExample]) -> Result<(), CalibrationError> {
    if examples.is_empty() {
        return Err(CalibrationError::EmptyDataset);
    }
    for (index, example) in examples.iter().enumerate() {
        if !example.input.is_finite() {
            return Err(CalibrationError::MalformedExample {
                index,
                reason: "input contains a non-finite value".to_string(),
            });
        }
        if !example.expected_output.is_finite() {
            return Err(CalibrationError::MalformedExample {
                index,
                reason: "expected_output is not a finite number".to_string(),
            });
        }
    }
    Ok(())
}

/// Run `engine` over `examples` and reduce the per-case errors.
///
/// Cases are estimated in parallel; the reduction runs in input order so the
/// result does not depend on scheduling.
pub fn evaluate(
    engine: &Engine,
    examples: &[CalibrationExample],
    tolerances: &Tolerances,
) -> Result<Evaluation, CalibrationError> {
    check_examples(examples)?;

    let cases: Vec<CaseError> = examples
        .par_iter()
        .enumerate()
        .map(|(index, example)| CaseError {
            index,
            input: example.input,
            expected: example.expected_output,
            actual: engine.compute(&example.input),
        })
        .collect();

    let count = cases.len();
    let mut total_error = 0.0;
    let mut total_percent = 0.0;
    let mut max_error = 0.0_f64;
    let mut exact = 0;
    let mut close = 0;
    for case in &cases {
        let abs = case.abs_error();
        total_error += abs;
        max_error = max_error.max(abs);
        if abs <= tolerances.exact {
            exact += 1;
        }
        if abs <= tolerances.close {
            close += 1;
        }
        if case.expected > 0.0 {
            total_percent += abs / case.expected;
        }
    }

    let mut abs_errors: Vec<f64> = cases.iter().map(CaseError::abs_error).collect();
    abs_errors.sort_by(f64::total_cmp);
    let median = if count % 2 == 1 {
        abs_errors[count / 2]
    } else {
        (abs_errors[count / 2 - 1] + abs_errors[count / 2]) / 2.0
    };

    let mut worst = cases;
    worst.sort_by(|a, b| {
        b.abs_error()
            .total_cmp(&a.abs_error())
            .then(a.index.cmp(&b.index))
    });
    worst.truncate(WORST_CASES);

    Ok(Evaluation {
        count,
        mean_absolute_error: total_error / count as f64,
        median_absolute_error: median,
        max_absolute_error: max_error,
        exact_match_count: exact,
        close_match_count: close,
        mean_percent_error: total_percent / count as f64,
        worst,
    })
}
