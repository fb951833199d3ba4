mod schema;

pub use schema::Config;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::scoring::validate_scoring;

/// Get the config directory path (~/.config/reimburse/)
pub fn get_config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("reimburse"))
}

/// Get the default config file path (~/.config/reimburse/config.yaml)
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.yaml"))
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses default path (~/.config/reimburse/config.yaml)
///
/// A missing file at the default location yields the built-in defaults. A
/// missing file at an explicitly given path is an error.
///
/// # Errors
///
/// Returns an error if:
/// - An explicit config path does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
/// - The configuration fails validation
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let explicit = path.is_some();
    let config_path = match path {
        Some(path) => path,
        None => get_config_path()?,
    };

    if !config_path.exists() {
        if explicit {
            anyhow::bail!("Config file not found at {}", config_path.display());
        }
        tracing::debug!(path = %config_path.display(), "no config file; using defaults");
        return Ok(Config::default());
    }

    let config = parse_config_file(&config_path)?;
    validate_config(&config)?;
    Ok(config)
}

fn parse_config_file(config_path: &Path) -> Result<Config> {
    let config_content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config: Config = serde_saphyr::from_str(&config_content).with_context(|| {
        format!("Failed to parse config: invalid YAML in {}", config_path.display())
    })?;

    Ok(config)
}

/// Validate every section, reporting all problems in one error.
pub fn validate_config(config: &Config) -> Result<()> {
    let mut errors = Vec::new();
    if let Some(ref scoring) = config.scoring {
        if let Err(scoring_errors) = validate_scoring(scoring) {
            errors.extend(scoring_errors);
        }
    }
    if let Some(ref calibration) = config.calibration {
        if let Err(e) = calibration.validate() {
            errors.push(format!("calibration: {}", e));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("Invalid configuration:\n  - {}", errors.join("\n  - "))
    }
}

/// Parameter store path: the configured one, or the default location.
pub fn parameters_path(config: &Config) -> Result<PathBuf> {
    match config.parameters_path {
        Some(ref path) => Ok(path.clone()),
        None => crate::calibrate::storage::get_parameters_path(),
    }
}
