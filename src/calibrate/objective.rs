use crate::error::CalibrationError;
use crate::evaluate::{evaluate, CalibrationExample, Tolerances};
use crate::scoring::{Engine, ParameterVector};

/// Calibration loss: `MAE + penalty_weight × (n − exact_match_count)`.
///
/// The second term rewards exact matches beyond what the mean error captures.
/// Candidates are scored on a private clone of the engine, so scoring many
/// vectors concurrently never touches the caller's engine.
#[derive(Debug)]
pub struct Objective<'a> {
    engine: &'a Engine,
    examples: &'a [CalibrationExample],
    tolerances: Tolerances,
    penalty_weight: f64,
}

impl<'a> Objective<'a> {
    pub fn new(
        engine: &'a Engine,
        examples: &'a [CalibrationExample],
        tolerances: Tolerances,
        penalty_weight: f64,
    ) -> Self {
        Self {
            engine,
            examples,
            tolerances,
            penalty_weight,
        }
    }

    /// Loss of the engine with `vector` applied on top of its current state.
    pub fn value(&self, vector: &ParameterVector) -> Result<f64, CalibrationError> {
        let mut candidate = self.engine.clone();
        candidate.apply_parameters(vector);
        self.score(&candidate)
    }

    /// Loss of `engine` as it is.
    pub fn score(&self, engine: &Engine) -> Result<f64, CalibrationError> {
        let evaluation = evaluate(engine, self.examples, &self.tolerances)?;
        let misses = (evaluation.count - evaluation.exact_match_count) as f64;
        Ok(evaluation.mean_absolute_error + self.penalty_weight * misses)
    }
}
