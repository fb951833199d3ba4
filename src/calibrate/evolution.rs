use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

use super::bounds::Bounds;
use super::CalibrationSettings;
use crate::error::CalibrationError;

/// Final state of a differential-evolution run, in parameter space.
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionOutcome {
    pub best: Vec<f64>,
    pub energy: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub converged: bool,
    pub cancelled: bool,
}

/// Minimize `energy` over the box `bounds` with `best/1/bin` differential
/// evolution.
///
/// The population lives in the unit cube and is scaled to `bounds` before each
/// evaluation. `initial` is clamped into the box and injected as the first
/// member. Trial vectors are drawn sequentially from one seeded RNG and then
/// scored in parallel, so a run is reproducible for a given seed regardless of
/// thread count. `cancel` is checked between generations only.
pub fn differential_evolution<F>(
    energy: F,
    bounds: &[Bounds],
    initial: &[f64],
    settings: &CalibrationSettings,
    cancel: &AtomicBool,
) -> Result<EvolutionOutcome, CalibrationError>
where
    F: Fn(&[f64]) -> Result<f64, CalibrationError> + Sync,
{
    let dim = bounds.len();
    if dim == 0 {
        return Err(CalibrationError::NoParameters);
    }

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let size = (settings.population_multiplier * dim).max(5);

    let mut population = latin_hypercube(&mut rng, size, dim);
    if initial.len() == dim {
        population[0] = bounds
            .iter()
            .zip(initial)
            .map(|(b, value)| b.to_unit(*value))
            .collect();
    }

    let scale = |unit: &[f64]| -> Vec<f64> {
        bounds
            .iter()
            .zip(unit)
            .map(|(b, u)| b.from_unit(*u))
            .collect()
    };
    let score_all = |members: &[Vec<f64>]| -> Result<Vec<f64>, CalibrationError> {
        members
            .par_iter()
            .map(|unit| energy(&scale(unit)).map(finite_or_worst))
            .collect()
    };

    let mut energies = score_all(&population)?;
    let mut evaluations = size;
    let mut best = index_of_min(&energies);

    let mut iterations = 0;
    let mut converged = false;
    let mut cancelled = false;

    while iterations < settings.max_iterations {
        if cancel.load(Ordering::Relaxed) {
            cancelled = true;
            break;
        }
        if has_converged(&energies, settings.tolerance) {
            converged = true;
            break;
        }

        let weight = if settings.mutation_max > settings.mutation_min {
            rng.random_range(settings.mutation_min..settings.mutation_max)
        } else {
            settings.mutation_min
        };

        let trials: Vec<Vec<f64>> = (0..size)
            .map(|i| {
                let (r1, r2) = pick_two(&mut rng, size, i);
                let fill = rng.random_range(0..dim);
                (0..dim)
                    .map(|j| {
                        let value = if j == fill || rng.random::<f64>() < settings.recombination {
                            population[best][j]
                                + weight * (population[r1][j] - population[r2][j])
                        } else {
                            population[i][j]
                        };
                        if (0.0..=1.0).contains(&value) {
                            value
                        } else {
                            rng.random::<f64>()
                        }
                    })
                    .collect()
            })
            .collect();

        let trial_energies = score_all(&trials)?;
        evaluations += size;

        for (i, (trial, trial_energy)) in trials.into_iter().zip(trial_energies).enumerate() {
            if trial_energy <= energies[i] {
                population[i] = trial;
                energies[i] = trial_energy;
                if trial_energy < energies[best] {
                    best = i;
                }
            }
        }

        iterations += 1;
        tracing::debug!(
            generation = iterations,
            best = energies[best],
            "differential evolution step"
        );
    }

    if !converged && !cancelled {
        converged = has_converged(&energies, settings.tolerance);
    }

    Ok(EvolutionOutcome {
        best: scale(&population[best]),
        energy: energies[best],
        iterations,
        evaluations,
        converged,
        cancelled,
    })
}

/// One sample per stratum in every dimension, strata shuffled per dimension.
fn latin_hypercube(rng: &mut StdRng, size: usize, dim: usize) -> Vec<Vec<f64>> {
    let mut population = vec![vec![0.0; dim]; size];
    let mut strata: Vec<usize> = (0..size).collect();
    for j in 0..dim {
        strata.shuffle(rng);
        for (member, stratum) in population.iter_mut().zip(&strata) {
            member[j] = (*stratum as f64 + rng.random::<f64>()) / size as f64;
        }
    }
    population
}

/// Two distinct population indices, both different from `exclude`.
fn pick_two(rng: &mut StdRng, size: usize, exclude: usize) -> (usize, usize) {
    let mut r1 = rng.random_range(0..size);
    while r1 == exclude {
        r1 = rng.random_range(0..size);
    }
    let mut r2 = rng.random_range(0..size);
    while r2 == exclude || r2 == r1 {
        r2 = rng.random_range(0..size);
    }
    (r1, r2)
}

fn index_of_min(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn finite_or_worst(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        f64::MAX
    }
}

/// `std(energies) ≤ tol × |mean(energies)|`.
fn has_converged(energies: &[f64], tolerance: f64) -> bool {
    let n = energies.len() as f64;
    let mean = energies.iter().sum::<f64>() / n;
    let variance = energies.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() <= tolerance * mean.abs()
}
