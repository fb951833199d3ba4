use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::evaluate::Evaluation;
use crate::scoring::{Engine, ParameterVector};

const STORE_VERSION: u32 = 1;

/// Calibrated parameters as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedParameters {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    /// Objective value the parameters reached, if they came from calibration.
    #[serde(default)]
    pub objective: Option<f64>,
    /// How the parameters scored against the cases they were calibrated on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<StoredPerformance>,
    pub parameters: BTreeMap<String, f64>,
}

/// Match counts recorded next to calibrated parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPerformance {
    pub cases: usize,
    pub exact_matches: usize,
    pub close_matches: usize,
}

impl From<&Evaluation> for StoredPerformance {
    fn from(evaluation: &Evaluation) -> Self {
        Self {
            cases: evaluation.count,
            exact_matches: evaluation.exact_match_count,
            close_matches: evaluation.close_match_count,
        }
    }
}

impl SavedParameters {
    pub fn new(vector: &ParameterVector, objective: Option<f64>) -> Self {
        Self {
            version: STORE_VERSION,
            saved_at: Utc::now(),
            objective,
            performance: None,
            parameters: vector.to_map(),
        }
    }

    pub fn with_performance(mut self, evaluation: &Evaluation) -> Self {
        self.performance = Some(StoredPerformance::from(evaluation));
        self
    }

    /// The stored values as a vector, ordered by name.
    pub fn to_vector(&self) -> ParameterVector {
        self.parameters
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect()
    }
}

/// Get the default parameter store path (~/.config/reimburse/parameters.json)
pub fn get_parameters_path() -> Result<PathBuf> {
    Ok(crate::config::get_config_dir()?.join("parameters.json"))
}

/// Load a parameter store file.
///
/// Unlike the config file, a missing store is an error here; callers decide
/// whether that matters.
pub fn load_parameters(path: &Path) -> Result<SavedParameters> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open parameter file at {}", path.display()))?;

    let saved: SavedParameters =
        serde_json::from_reader(file).context("Failed to load calibrated parameters")?;

    if saved.version != STORE_VERSION {
        anyhow::bail!("Unsupported parameter file version: {}", saved.version);
    }
    if let Some((name, value)) = saved.parameters.iter().find(|(_, v)| !v.is_finite()) {
        anyhow::bail!("Parameter '{}' has a non-finite value: {}", name, value);
    }

    Ok(saved)
}

/// Save parameters atomically, creating the parent directory if needed.
pub fn save_parameters(path: &Path, saved: &SavedParameters) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, saved)
        .context("Failed to serialize calibrated parameters")?;

    file.commit().context("Failed to save calibrated parameters")?;

    tracing::info!(path = %path.display(), count = saved.parameters.len(), "saved parameters");
    Ok(())
}

/// Load `path` and apply it to `engine`.
///
/// On any failure the error is returned and `engine` is left exactly as it
/// was, so estimation keeps its last good parameters.
pub fn try_load_parameters(engine: &mut Engine, path: &Path) -> Result<SavedParameters> {
    let saved = load_parameters(path)?;
    let vector = saved.to_vector();

    let current = engine.collect_parameters();
    let unknown = vector
        .names()
        .filter(|name| current.get(name).is_none())
        .count();
    if unknown > 0 {
        tracing::warn!(
            path = %path.display(),
            unknown,
            "ignoring parameters the engine does not declare"
        );
    }

    engine.apply_parameters(&vector);
    Ok(saved)
}
