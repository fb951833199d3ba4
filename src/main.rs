use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use reimburse::calibrate::storage::{save_parameters, try_load_parameters, SavedParameters};
use reimburse::calibrate::Calibrator;
use reimburse::evaluate::{evaluate, load_cases, CalibrationExample};
use reimburse::scoring::{Engine, InputRecord, QuirkConfig};
use reimburse::CalibrationError;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
// 2 is clap's usage-error code
const EXIT_DATA: i32 = 3;
const EXIT_CONFIG: i32 = 4;
const EXIT_CALIBRATION: i32 = 5;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Estimate the reimbursement for one trip
    Estimate {
        /// Trip duration in days
        #[arg(value_parser = parse_non_negative)]
        days: f64,
        /// Distance traveled
        #[arg(value_parser = parse_non_negative)]
        distance: f64,
        /// Total expense amount
        #[arg(value_parser = parse_non_negative)]
        expense: f64,
        /// Show each component's contribution
        #[arg(short, long)]
        breakdown: bool,
    },
    /// Report accuracy against a labeled case file
    Evaluate {
        /// JSON case file
        #[arg(long)]
        cases: PathBuf,
    },
    /// Tune parameters against a labeled case file and save them
    Calibrate {
        /// JSON case file
        #[arg(long)]
        cases: PathBuf,
        /// Maximum number of generations (overrides config)
        #[arg(long)]
        max_iterations: Option<usize>,
        /// Random seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,
        /// Do not write the calibrated parameters
        #[arg(long)]
        no_save: bool,
    },
    /// List the current parameters
    Params,
}

#[derive(Parser, Debug)]
#[command(name = "reimburse")]
#[command(about = "Trip reimbursement estimator with offline calibration", long_about = None)]
#[command(version)]
#[command(allow_negative_numbers = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/reimburse/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the parameter store (defaults to ~/.config/reimburse/parameters.json)
    #[arg(short, long, global = true)]
    params: Option<PathBuf>,

    /// Disable the cents quirk
    #[arg(long, global = true)]
    no_quirk: bool,

    #[command(subcommand)]
    command: Commands,
}

fn parse_non_negative(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", s))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("'{}' must be a non-negative number", s));
    }
    Ok(value)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let start_time = Instant::now();

    // Load config
    let config = match reimburse::config::load_config(cli.config.clone()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let params_path = match cli.params.clone() {
        Some(path) => path,
        None => match reimburse::config::parameters_path(&config) {
            Ok(path) => path,
            Err(e) => {
                eprintln!("Config error: {:#}", e);
                std::process::exit(EXIT_CONFIG);
            }
        },
    };

    let mut scoring = config.scoring();
    if cli.no_quirk {
        scoring.quirk.get_or_insert_with(QuirkConfig::default).enabled = false;
    }
    let mut engine = Engine::new(&scoring);
    let stored = load_saved_parameters(&mut engine, &params_path, cli.params.is_some());

    let use_colors = reimburse::output::should_use_colors();

    // Route based on subcommand
    match cli.command {
        Commands::Estimate {
            days,
            distance,
            expense,
            breakdown,
        } => {
            let record = InputRecord::new(days, distance, expense);
            if breakdown {
                let breakdown = engine.breakdown(&record);
                println!("{}", reimburse::output::format_breakdown(&breakdown, use_colors));
            } else {
                println!("{}", reimburse::output::format_amount(engine.compute(&record)));
            }
        }
        Commands::Evaluate { cases } => {
            let examples = load_cases_or_exit(&cases);
            match evaluate(&engine, &examples, &config.calibration().tolerances) {
                Ok(evaluation) => {
                    println!("{}", reimburse::output::format_evaluation(&evaluation, use_colors));
                }
                Err(e) => {
                    eprintln!("Evaluation failed: {}", e);
                    std::process::exit(exit_code_for(&e));
                }
            }
        }
        Commands::Calibrate {
            cases,
            max_iterations,
            seed,
            no_save,
        } => {
            let examples = load_cases_or_exit(&cases);

            let mut settings = config.calibration();
            if let Some(max_iterations) = max_iterations {
                settings.max_iterations = max_iterations;
            }
            if let Some(seed) = seed {
                settings.seed = seed;
            }

            let tolerances = settings.tolerances;
            let calibrator = Calibrator::new(settings);
            let result = match calibrator.optimize(&mut engine, &examples) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Calibration failed: {}", e);
                    std::process::exit(exit_code_for(&e));
                }
            };

            println!("{}", reimburse::output::format_calibration(&result, use_colors));

            if no_save {
                if cli.verbose {
                    eprintln!("Not saving parameters (--no-save)");
                }
            } else if result.improved() {
                let mut saved =
                    SavedParameters::new(&result.best_vector, Some(result.objective_value));
                match evaluate(&engine, &examples, &tolerances) {
                    Ok(evaluation) => saved = saved.with_performance(&evaluation),
                    Err(e) => tracing::warn!(error = %e, "could not score calibrated parameters"),
                }
                if let Err(e) = save_parameters(&params_path, &saved) {
                    eprintln!("Failed to save parameters: {:#}", e);
                    std::process::exit(EXIT_CALIBRATION);
                }
                println!("Saved parameters to {}", params_path.display());
            }
        }
        Commands::Params => {
            if let Some(saved) = &stored {
                println!("{}\n", reimburse::output::format_saved_summary(saved, use_colors));
            }
            let vector = engine.collect_parameters();
            println!("{}", reimburse::output::format_parameters(&vector, use_colors));
        }
    }

    if cli.verbose {
        eprintln!(
            "Done in {}",
            reimburse::output::format_elapsed(start_time.elapsed())
        );
    }

    std::process::exit(EXIT_SUCCESS);
}

/// Apply the parameter store if there is one. Failures only warn: estimation
/// keeps the configured defaults.
fn load_saved_parameters(
    engine: &mut Engine,
    path: &Path,
    explicit: bool,
) -> Option<SavedParameters> {
    if !path.exists() {
        if explicit {
            tracing::warn!(path = %path.display(), "parameter file not found; using defaults");
        } else {
            tracing::debug!(path = %path.display(), "no parameter file; using defaults");
        }
        return None;
    }

    match try_load_parameters(engine, path) {
        Ok(saved) => {
            tracing::debug!(
                path = %path.display(),
                count = saved.parameters.len(),
                saved_at = %saved.saved_at,
                "loaded calibrated parameters"
            );
            Some(saved)
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %format!("{:#}", e),
                "could not load parameters; using defaults"
            );
            None
        }
    }
}

fn load_cases_or_exit(path: &Path) -> Vec<CalibrationExample> {
    match load_cases(path) {
        Ok(cases) => cases,
        Err(e) => {
            eprintln!("Data error: {:#}", e);
            std::process::exit(EXIT_DATA);
        }
    }
}

fn exit_code_for(error: &CalibrationError) -> i32 {
    match error {
        CalibrationError::EmptyDataset | CalibrationError::MalformedExample { .. } => EXIT_DATA,
        CalibrationError::InvalidSettings(_) => EXIT_CONFIG,
        CalibrationError::OptimizerUnavailable | CalibrationError::NoParameters => {
            EXIT_CALIBRATION
        }
    }
}
