mod bounds;
#[cfg(feature = "optimizer")]
mod evolution;
mod objective;
pub mod storage;

pub use bounds::{infer_bounds, Bounds};
pub use objective::Objective;

use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::CalibrationError;
use crate::evaluate::{check_examples, CalibrationExample, Tolerances};
use crate::scoring::{Engine, ParameterVector};

/// Tuning of the differential-evolution search.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CalibrationSettings {
    /// Maximum number of generations.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Population size is `max(5, population_multiplier × parameters)`.
    #[serde(default = "default_population_multiplier")]
    pub population_multiplier: usize,

    /// Relative convergence tolerance on the spread of population energies.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Differential weight is drawn from `[mutation_min, mutation_max)` once
    /// per generation.
    #[serde(default = "default_mutation_min")]
    pub mutation_min: f64,

    #[serde(default = "default_mutation_max")]
    pub mutation_max: f64,

    /// Crossover probability.
    #[serde(default = "default_recombination")]
    pub recombination: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Weight of each non-exact case in the objective.
    #[serde(default = "default_penalty_weight")]
    pub penalty_weight: f64,

    #[serde(default)]
    pub tolerances: Tolerances,
}

fn default_max_iterations() -> usize {
    100
}

fn default_population_multiplier() -> usize {
    15
}

fn default_tolerance() -> f64 {
    0.01
}

fn default_mutation_min() -> f64 {
    0.5
}

fn default_mutation_max() -> f64 {
    1.0
}

fn default_recombination() -> f64 {
    0.7
}

fn default_seed() -> u64 {
    42
}

fn default_penalty_weight() -> f64 {
    0.01
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            population_multiplier: default_population_multiplier(),
            tolerance: default_tolerance(),
            mutation_min: default_mutation_min(),
            mutation_max: default_mutation_max(),
            recombination: default_recombination(),
            seed: default_seed(),
            penalty_weight: default_penalty_weight(),
            tolerances: Tolerances::default(),
        }
    }
}

impl CalibrationSettings {
    pub fn validate(&self) -> Result<(), CalibrationError> {
        let invalid = |msg: &str| Err(CalibrationError::InvalidSettings(msg.to_string()));

        if self.population_multiplier == 0 {
            return invalid("population_multiplier must be at least 1");
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return invalid("tolerance must be a non-negative number");
        }
        if !(self.mutation_min.is_finite() && self.mutation_max.is_finite())
            || self.mutation_min < 0.0
            || self.mutation_min > self.mutation_max
            || self.mutation_max > 2.0
        {
            return invalid("mutation range must satisfy 0 <= mutation_min <= mutation_max <= 2");
        }
        if !(0.0..=1.0).contains(&self.recombination) {
            return invalid("recombination must be within [0, 1]");
        }
        if !(self.penalty_weight.is_finite() && self.penalty_weight >= 0.0) {
            return invalid("penalty_weight must be a non-negative number");
        }
        let t = &self.tolerances;
        if !(t.exact.is_finite() && t.close.is_finite()) || t.exact < 0.0 || t.exact > t.close {
            return invalid("tolerances must satisfy 0 <= exact <= close");
        }
        Ok(())
    }
}

/// Outcome of [`Calibrator::optimize`].
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationResult {
    /// Parameters now applied to the engine.
    pub best_vector: ParameterVector,
    pub objective_value: f64,
    /// Objective of the parameters the engine had before calibration.
    pub baseline_objective: f64,
    /// Generations completed.
    pub iterations: usize,
    pub converged: bool,
    /// Stopped by the cancellation flag.
    pub terminated_early: bool,
    pub evaluations: usize,
    pub elapsed: Duration,
}

impl CalibrationResult {
    /// Whether the search found something strictly better than the baseline.
    pub fn improved(&self) -> bool {
        self.objective_value < self.baseline_objective
    }
}

/// Black-box calibration of an [`Engine`] against labeled cases.
#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    settings: CalibrationSettings,
    cancel: Arc<AtomicBool>,
}

impl Calibrator {
    pub fn new(settings: CalibrationSettings) -> Self {
        Self {
            settings,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    /// Flag that stops the search at the next generation boundary when set.
    /// The best vector found so far is still applied.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Search for parameters minimizing the [`Objective`] over `examples`,
    /// then apply them to `engine`.
    ///
    /// `engine` is only read during the search and updated once at the end.
    /// The result is never worse than the engine's starting parameters: when
    /// nothing better is found, the starting vector is kept.
    pub fn optimize(
        &self,
        engine: &mut Engine,
        examples: &[CalibrationExample],
    ) -> Result<CalibrationResult, CalibrationError> {
        self.settings.validate()?;
        check_examples(examples)?;

        let baseline = collect_parameters(engine);
        if baseline.is_empty() {
            return Err(CalibrationError::NoParameters);
        }

        let started = Instant::now();
        let objective = Objective::new(
            engine,
            examples,
            self.settings.tolerances,
            self.settings.penalty_weight,
        );
        let baseline_objective = objective.score(engine)?;

        let bounds: Vec<Bounds> = baseline
            .iter()
            .map(|(name, value)| infer_bounds(name, value))
            .collect();

        tracing::info!(
            parameters = baseline.len(),
            examples = examples.len(),
            baseline = baseline_objective,
            "starting calibration"
        );

        let search = self.search(&objective, &baseline, &bounds)?;

        let (best, objective_value) = if search.energy < baseline_objective {
            (baseline.with_values(&search.best), search.energy)
        } else {
            tracing::info!("no improvement over baseline; keeping current parameters");
            (baseline.clone(), baseline_objective)
        };

        engine.apply_parameters(&best);

        let result = CalibrationResult {
            best_vector: collect_parameters(engine),
            objective_value,
            baseline_objective,
            iterations: search.iterations,
            converged: search.converged,
            terminated_early: search.cancelled,
            evaluations: search.evaluations,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            objective = result.objective_value,
            iterations = result.iterations,
            converged = result.converged,
            "calibration finished"
        );
        Ok(result)
    }

    #[cfg(feature = "optimizer")]
    fn search(
        &self,
        objective: &Objective<'_>,
        baseline: &ParameterVector,
        bounds: &[Bounds],
    ) -> Result<Search, CalibrationError> {
        let outcome = evolution::differential_evolution(
            |values| objective.value(&baseline.with_values(values)),
            bounds,
            &baseline.values(),
            &self.settings,
            &self.cancel,
        )?;
        Ok(Search {
            best: outcome.best,
            energy: outcome.energy,
            iterations: outcome.iterations,
            evaluations: outcome.evaluations,
            converged: outcome.converged,
            cancelled: outcome.cancelled,
        })
    }

    #[cfg(not(feature = "optimizer"))]
    fn search(
        &self,
        _objective: &Objective<'_>,
        _baseline: &ParameterVector,
        _bounds: &[Bounds],
    ) -> Result<Search, CalibrationError> {
        Err(CalibrationError::OptimizerUnavailable)
    }
}

struct Search {
    best: Vec<f64>,
    energy: f64,
    iterations: usize,
    evaluations: usize,
    converged: bool,
    cancelled: bool,
}

/// Every component parameter of `engine`, qualified by component id.
pub fn collect_parameters(engine: &Engine) -> ParameterVector {
    engine.collect_parameters()
}

/// Calibrate with default settings and at most `max_iterations` generations.
pub fn optimize(
    engine: &mut Engine,
    examples: &[CalibrationExample],
    max_iterations: usize,
) -> Result<CalibrationResult, CalibrationError> {
    Calibrator::new(CalibrationSettings {
        max_iterations,
        ..CalibrationSettings::default()
    })
    .optimize(engine, examples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::duration::DurationBase;
    use crate::scoring::{DurationConfig, InputRecord, ScoringComponent};

    fn per_diem_engine(daily_rate: f64) -> Engine {
        let components: Vec<Box<dyn ScoringComponent>> =
            vec![Box::new(DurationBase::from_config(&DurationConfig {
                daily_rate,
                overrides: vec![],
            }))];
        Engine::with_components(components, vec![])
    }

    fn labeled_by(engine: &Engine) -> Vec<CalibrationExample> {
        (1..=10)
            .map(|d| {
                let input = InputRecord::new(f64::from(d), 0.0, 0.0);
                CalibrationExample::new(input, engine.compute(&input))
            })
            .collect()
    }

    #[test]
    fn test_settings_defaults() {
        let settings = CalibrationSettings::default();
        assert_eq!(settings.max_iterations, 100);
        assert_eq!(settings.population_multiplier, 15);
        assert_eq!(settings.seed, 42);
        assert_eq!(settings.recombination, 0.7);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_settings() {
        let settings = CalibrationSettings {
            recombination: 1.5,
            ..CalibrationSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(CalibrationError::InvalidSettings(_))
        ));

        let mut engine = per_diem_engine(100.0);
        let examples = labeled_by(&engine);
        let result = Calibrator::new(settings).optimize(&mut engine, &examples);
        assert!(matches!(result, Err(CalibrationError::InvalidSettings(_))));
    }

    #[test]
    fn test_empty_dataset_fails() {
        let mut engine = per_diem_engine(100.0);
        let result = optimize(&mut engine, &[], 10);
        assert_eq!(result.unwrap_err(), CalibrationError::EmptyDataset);
    }

    #[test]
    fn test_malformed_example_fails_and_engine_is_untouched() {
        let mut engine = per_diem_engine(100.0);
        let mut examples = labeled_by(&engine);
        examples[3].input.distance = f64::INFINITY;
        let result = optimize(&mut engine, &examples, 10);
        assert!(matches!(
            result,
            Err(CalibrationError::MalformedExample { index: 3, .. })
        ));
        assert_eq!(engine.collect_parameters().get("duration.daily_rate"), Some(100.0));
    }

    #[test]
    fn test_no_parameters() {
        let mut engine = Engine::with_components(vec![], vec![]);
        let examples = vec![CalibrationExample::new(InputRecord::new(1.0, 0.0, 0.0), 0.0)];
        assert_eq!(
            optimize(&mut engine, &examples, 10).unwrap_err(),
            CalibrationError::NoParameters
        );
    }

    #[cfg(feature = "optimizer")]
    #[test]
    fn test_recovers_daily_rate() {
        let examples = labeled_by(&per_diem_engine(120.0));
        let mut engine = per_diem_engine(100.0);
        let result = optimize(&mut engine, &examples, 100).unwrap();

        assert!(result.improved());
        assert!(result.objective_value < result.baseline_objective / 2.0);
        let rate = engine.collect_parameters().get("duration.daily_rate").unwrap();
        assert_eq!(result.best_vector.get("duration.daily_rate"), Some(rate));
        assert!((rate - 120.0).abs() < 20.0, "rate {}", rate);
    }

    #[cfg(feature = "optimizer")]
    #[test]
    fn test_never_worse_than_baseline() {
        let mut engine = per_diem_engine(100.0);
        let examples = labeled_by(&engine);
        let before = engine.collect_parameters();

        let result = optimize(&mut engine, &examples, 20).unwrap();
        assert_eq!(result.baseline_objective, 0.0);
        assert!(result.objective_value <= result.baseline_objective);
        assert_eq!(result.best_vector, before);
        assert_eq!(engine.collect_parameters(), before);
    }

    #[cfg(feature = "optimizer")]
    #[test]
    fn test_reproducible() {
        let examples = labeled_by(&per_diem_engine(130.0));
        let mut a = per_diem_engine(100.0);
        let mut b = per_diem_engine(100.0);
        let ra = optimize(&mut a, &examples, 30).unwrap();
        let rb = optimize(&mut b, &examples, 30).unwrap();
        assert_eq!(ra.best_vector, rb.best_vector);
        assert_eq!(ra.objective_value, rb.objective_value);
    }

    #[cfg(feature = "optimizer")]
    #[test]
    fn test_cancelled_run_still_applies_best() {
        let examples = labeled_by(&per_diem_engine(120.0));
        let mut engine = per_diem_engine(100.0);
        let calibrator = Calibrator::default();
        calibrator
            .cancel_handle()
            .store(true, std::sync::atomic::Ordering::Relaxed);

        let result = calibrator.optimize(&mut engine, &examples).unwrap();
        assert!(result.terminated_early);
        assert_eq!(result.iterations, 0);
        assert!(result.objective_value <= result.baseline_objective);
        assert_eq!(engine.collect_parameters(), result.best_vector);
    }

    #[cfg(not(feature = "optimizer"))]
    #[test]
    fn test_optimizer_unavailable() {
        let mut engine = per_diem_engine(100.0);
        let examples = labeled_by(&engine);
        assert_eq!(
            optimize(&mut engine, &examples, 10).unwrap_err(),
            CalibrationError::OptimizerUnavailable
        );
    }
}
